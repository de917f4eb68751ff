use crate::config::LendingTerms;
use crate::error::{Result, SimError};
use crate::types::Month;

/// One obligor's credit facility.
///
/// Every field is fixed at construction; per-trial default outcomes live in
/// [`crate::sampler::TrialState`], never on the borrower, so one portfolio can
/// be shared by any number of concurrent trials.
#[derive(Debug, Clone, PartialEq)]
pub struct Borrower {
    name: String,
    principal_outstanding: f64,
    facility_limit: f64,
    loss_given_default: f64,
    probability_of_default: f64,
    risk_rate: f64,
    pd_buffer: f64,
    risk_rate_buffer: f64,
    recovery_period: u32,
    exposure_at_default: f64,
    annual_risk_rate_income: f64,
    gross_write_off: f64,
}

impl Borrower {
    /// Validate the six facility fields against `terms` and derive income and
    /// write-off.
    pub fn new(
        name: impl Into<String>,
        principal_outstanding: f64,
        facility_limit: f64,
        loss_given_default: f64,
        probability_of_default: f64,
        risk_rate: f64,
        terms: &LendingTerms,
    ) -> Result<Self> {
        non_negative("principal_outstanding", principal_outstanding)?;
        non_negative("facility_limit", facility_limit)?;
        fraction("loss_given_default", loss_given_default)?;
        fraction("probability_of_default", probability_of_default)?;
        non_negative("risk_rate", risk_rate)?;
        finite("pd_buffer", terms.pd_buffer)?;
        finite("risk_rate_buffer", terms.risk_rate_buffer)?;
        finite("exposure_at_default", terms.exposure_at_default)?;
        if terms.recovery_period == 0 {
            return Err(SimError::validation("recovery_period", "must be at least one month"));
        }

        Ok(Borrower {
            name: name.into(),
            principal_outstanding,
            facility_limit,
            loss_given_default,
            probability_of_default,
            risk_rate,
            pd_buffer: terms.pd_buffer,
            risk_rate_buffer: terms.risk_rate_buffer,
            recovery_period: terms.recovery_period,
            exposure_at_default: terms.exposure_at_default,
            annual_risk_rate_income: principal_outstanding * risk_rate,
            gross_write_off: principal_outstanding.max(facility_limit),
        })
    }

    /// Build from a text record laid out as
    /// `name, principal, limit, lgd, pd, risk_rate[, ignored…]`.
    ///
    /// `row` is the 1-based position of the record in its source and is
    /// attached to any validation error.
    pub fn from_record<S: AsRef<str>>(row: usize, fields: &[S], terms: &LendingTerms) -> Result<Self> {
        const FIELDS: [&str; 6] = [
            "name",
            "principal_outstanding",
            "facility_limit",
            "loss_given_default",
            "probability_of_default",
            "risk_rate",
        ];
        if fields.len() < FIELDS.len() {
            let missing = FIELDS[fields.len()];
            return Err(SimError::validation(missing, "field missing").at_record(row));
        }

        let number = |i: usize| parse_number(FIELDS[i], fields[i].as_ref()).map_err(|e| e.at_record(row));

        Borrower::new(
            fields[0].as_ref().trim(),
            number(1)?,
            number(2)?,
            number(3)?,
            number(4)?,
            number(5)?,
            terms,
        )
        .map_err(|e| e.at_record(row))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn principal_outstanding(&self) -> f64 {
        self.principal_outstanding
    }

    pub fn facility_limit(&self) -> f64 {
        self.facility_limit
    }

    pub fn loss_given_default(&self) -> f64 {
        self.loss_given_default
    }

    pub fn probability_of_default(&self) -> f64 {
        self.probability_of_default
    }

    pub fn risk_rate(&self) -> f64 {
        self.risk_rate
    }

    pub fn pd_buffer(&self) -> f64 {
        self.pd_buffer
    }

    pub fn risk_rate_buffer(&self) -> f64 {
        self.risk_rate_buffer
    }

    pub fn recovery_period(&self) -> u32 {
        self.recovery_period
    }

    pub fn exposure_at_default(&self) -> f64 {
        self.exposure_at_default
    }

    /// principal × annual risk rate.
    pub fn annual_risk_rate_income(&self) -> f64 {
        self.annual_risk_rate_income
    }

    /// max(principal, limit): the whole facility is assumed drawn at default.
    pub fn gross_write_off(&self) -> f64 {
        self.gross_write_off
    }

    /// Default threshold for a uniform draw. Deliberately unclamped: a buffer
    /// that pushes this above 1 makes default certain.
    pub fn buffered_pd(&self) -> f64 {
        self.probability_of_default * (1.0 + self.pd_buffer)
    }

    /// Risk-rate income earned in one month while performing.
    pub fn monthly_income(&self) -> f64 {
        self.annual_risk_rate_income * (1.0 + self.risk_rate_buffer) / Month::MONTHS_PER_YEAR as f64
    }

    /// Recovery received in each month of the recovery period.
    pub fn monthly_recovery(&self) -> f64 {
        self.gross_write_off * (1.0 - self.loss_given_default) / self.recovery_period as f64
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64> {
    let raw = raw.trim();
    raw.parse::<f64>()
        .map_err(|_| SimError::validation(field, format!("{raw:?} is not a number")))
}

fn finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimError::validation(field, format!("{value} is not finite")))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(SimError::validation(field, format!("{value} is negative")));
    }
    Ok(())
}

fn fraction(field: &'static str, value: f64) -> Result<()> {
    finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(SimError::validation(field, format!("{value} is outside [0, 1]")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn terms() -> LendingTerms {
        LendingTerms::default()
    }

    fn field_of(err: SimError) -> (Option<usize>, &'static str) {
        match err {
            SimError::Validation { record, field, .. } => (record, field),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn derives_income_and_write_off() {
        let b = Borrower::new("Acme", 100_000.0, 150_000.0, 0.4, 0.02, 0.05, &terms()).unwrap();
        assert_eq!(b.annual_risk_rate_income(), 5_000.0);
        assert_eq!(b.gross_write_off(), 150_000.0);
        assert_eq!(b.recovery_period(), 6);
        assert_eq!(b.exposure_at_default(), 2.0);
    }

    #[test]
    fn write_off_uses_principal_when_above_limit() {
        let b = Borrower::new("Over", 120_000.0, 100_000.0, 0.4, 0.02, 0.05, &terms()).unwrap();
        assert_eq!(b.gross_write_off(), 120_000.0);
    }

    #[test]
    fn buffers_come_from_terms() {
        let t = LendingTerms { pd_buffer: 0.5, risk_rate_buffer: 0.2, ..LendingTerms::default() };
        let b = Borrower::new("B", 120_000.0, 0.0, 0.5, 0.1, 0.1, &t).unwrap();
        assert!((b.buffered_pd() - 0.15).abs() < 1e-12);
        assert!((b.monthly_income() - 12_000.0 * 1.2 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn buffered_pd_is_not_clamped() {
        let t = LendingTerms { pd_buffer: 1.0, ..LendingTerms::default() };
        let b = Borrower::new("B", 1.0, 1.0, 0.5, 0.8, 0.1, &t).unwrap();
        assert!(b.buffered_pd() > 1.0, "pd × (1 + buffer) = {}", b.buffered_pd());
    }

    #[test]
    fn rejects_out_of_domain_fields() {
        let t = terms();
        let cases = [
            (Borrower::new("x", -1.0, 0.0, 0.4, 0.1, 0.05, &t), "principal_outstanding"),
            (Borrower::new("x", 1.0, -1.0, 0.4, 0.1, 0.05, &t), "facility_limit"),
            (Borrower::new("x", 1.0, 1.0, 1.4, 0.1, 0.05, &t), "loss_given_default"),
            (Borrower::new("x", 1.0, 1.0, 0.4, -0.1, 0.05, &t), "probability_of_default"),
            (Borrower::new("x", 1.0, 1.0, 0.4, 0.1, -0.05, &t), "risk_rate"),
            (Borrower::new("x", f64::NAN, 1.0, 0.4, 0.1, 0.05, &t), "principal_outstanding"),
        ];
        for (result, expected) in cases {
            let (record, field) = field_of(result.unwrap_err());
            assert_eq!(field, expected);
            assert_eq!(record, None);
        }
    }

    #[test]
    fn rejects_zero_recovery_period() {
        let t = LendingTerms { recovery_period: 0, ..LendingTerms::default() };
        let (_, field) = field_of(Borrower::new("x", 1.0, 1.0, 0.4, 0.1, 0.05, &t).unwrap_err());
        assert_eq!(field, "recovery_period");
    }

    #[test]
    fn from_record_parses_and_ignores_extra_fields() {
        let rec = ["Acme Ltd", " 250000 ", "300000", "0.45", "0.03", "0.08", "extra", "more"];
        let b = Borrower::from_record(2, &rec, &terms()).unwrap();
        assert_eq!(b.name(), "Acme Ltd");
        assert_eq!(b.principal_outstanding(), 250_000.0);
        assert_eq!(b.facility_limit(), 300_000.0);
        assert_eq!(b.gross_write_off(), 300_000.0);
        assert_eq!(b.probability_of_default(), 0.03);
    }

    #[test]
    fn from_record_reports_row_and_field() {
        let rec = ["Acme", "250000", "abc", "0.45", "0.03", "0.08"];
        let (record, field) = field_of(Borrower::from_record(7, &rec, &terms()).unwrap_err());
        assert_eq!(record, Some(7));
        assert_eq!(field, "facility_limit");

        let rec = ["Acme", "250000", "1", "0.45", "1.03", "0.08"];
        let (record, field) = field_of(Borrower::from_record(3, &rec, &terms()).unwrap_err());
        assert_eq!(record, Some(3));
        assert_eq!(field, "probability_of_default");
    }

    #[test]
    fn from_record_short_row_names_first_missing_field() {
        let rec = ["Acme", "250000", "1", "0.45"];
        let (record, field) = field_of(Borrower::from_record(5, &rec, &terms()).unwrap_err());
        assert_eq!(record, Some(5));
        assert_eq!(field, "probability_of_default");
    }

    proptest! {
        #[test]
        fn derived_quantities_hold(
            principal in 0.0f64..1e9,
            limit in 0.0f64..1e9,
            lgd in 0.0f64..=1.0,
            pd in 0.0f64..=1.0,
            rate in 0.0f64..0.5,
        ) {
            let b = Borrower::new("p", principal, limit, lgd, pd, rate, &LendingTerms::default()).unwrap();
            prop_assert_eq!(b.annual_risk_rate_income(), principal * rate);
            prop_assert_eq!(b.gross_write_off(), principal.max(limit));
        }
    }
}
