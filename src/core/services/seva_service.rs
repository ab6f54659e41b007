//! Seva prasad quantities: what each booked seva is owed and which sevas a
//! plan may be linked to.

use chrono::NaiveDate;

use crate::config::SevaRates;
use crate::core::services::{invalid_field, ServiceError, ServiceResult};
use crate::domain::{
    common::quantity_le, KitchenPlan, PrasadCategory, Seva, SevaDirectory, SevaPrasadLink,
};

pub struct SevaCalculator;

impl SevaCalculator {
    pub fn expected_quantity(booking_count: u32, rate_per_booking: f64) -> f64 {
        f64::from(booking_count) * rate_per_booking
    }

    /// Paid seva categories take paid sevas only, free ones free sevas only.
    pub fn validate_link(category: PrasadCategory, seva_is_free: bool) -> ServiceResult<()> {
        if !category.is_seva_based() || category.metadata().is_free != seva_is_free {
            return Err(ServiceError::IncompatibleSeva {
                category,
                seva_is_free,
            });
        }
        Ok(())
    }

    pub fn default_rate(category: PrasadCategory, rates: &SevaRates) -> f64 {
        if category.metadata().is_free {
            rates.free_per_booking
        } else {
            rates.paid_per_booking
        }
    }

    /// Builds a fresh link for `seva`, using `rate_override` when given.
    pub fn build_link(
        category: PrasadCategory,
        seva: &Seva,
        rates: &SevaRates,
        rate_override: Option<f64>,
    ) -> ServiceResult<SevaPrasadLink> {
        Self::validate_link(category, seva.is_free)?;
        let rate = rate_override.unwrap_or_else(|| Self::default_rate(category, rates));
        if !(rate.is_finite() && rate > 0.0) {
            return Err(invalid_field("rate_per_booking", "must be greater than zero"));
        }
        Ok(SevaPrasadLink {
            seva_id: seva.id.clone(),
            seva_name: seva.name.clone(),
            booking_count: seva.booking_slots,
            rate_per_booking: rate,
            expected_quantity: Self::expected_quantity(seva.booking_slots, rate),
            distributed_quantity: 0.0,
            last_distributed_at: None,
        })
    }

    /// Inserts or replaces the link for `link.seva_id` on the plan.
    ///
    /// Replacing keeps what was already handed out, so the new expected
    /// quantity may not drop below it.
    pub fn link_seva(plan: &mut KitchenPlan, link: SevaPrasadLink) -> ServiceResult<()> {
        match plan.seva_link_mut(&link.seva_id) {
            Some(existing) => {
                if !quantity_le(existing.distributed_quantity, link.expected_quantity) {
                    return Err(invalid_field(
                        "expected_quantity",
                        "must not be below the quantity already distributed",
                    ));
                }
                let distributed = existing.distributed_quantity;
                let last = existing.last_distributed_at;
                *existing = SevaPrasadLink {
                    distributed_quantity: distributed,
                    last_distributed_at: last,
                    ..link
                };
            }
            None => plan.seva_links.push(link),
        }
        Ok(())
    }

    /// Links for every seva of `temple_id` on `date` that fits the category.
    /// Sevas of the other kind (free vs paid) are skipped.
    pub fn links_for_date(
        directory: &dyn SevaDirectory,
        rates: &SevaRates,
        category: PrasadCategory,
        temple_id: &str,
        date: NaiveDate,
    ) -> ServiceResult<Vec<SevaPrasadLink>> {
        if !category.is_seva_based() {
            return Err(ServiceError::Invalid(format!(
                "{} plans are not linked to sevas",
                category
            )));
        }
        directory
            .sevas_by_date(date)
            .iter()
            .filter(|seva| seva.temple_id == temple_id)
            .filter(|seva| Self::validate_link(category, seva.is_free).is_ok())
            .map(|seva| Self::build_link(category, seva, rates, None))
            .collect()
    }
}
