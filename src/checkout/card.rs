use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::AppError;

/// Card details as typed by the user. Only the format is checked; nothing is
/// sent to a payment gateway.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardForm {
    pub holder: String,
    pub number: String,
    /// `MM/YY`
    pub expiry: String,
    pub cvv: String,
}

impl CardForm {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut fail = |field: &str, msg: &str| {
            errors
                .entry(field.to_string())
                .or_default()
                .push(msg.to_string());
        };

        if self.holder.trim().is_empty() {
            fail("holder", "cardholder name is required");
        }

        let digits: String = self
            .number
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if !(13..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
            fail("number", "card number must have 13 to 19 digits");
        }

        if !valid_expiry(self.expiry.trim()) {
            fail("expiry", "expiry must be MM/YY");
        }

        let cvv = self.cvv.trim();
        if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            fail("cvv", "CVV must have 3 or 4 digits");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation {
                message: "invalid card details".into(),
                errors,
            })
        }
    }

    /// Last four digits, for confirmation messages.
    pub fn last4(&self) -> String {
        let digits: Vec<char> = self.number.chars().filter(|c| c.is_ascii_digit()).collect();
        digits[digits.len().saturating_sub(4)..].iter().collect()
    }
}

fn valid_expiry(s: &str) -> bool {
    let Some((mm, yy)) = s.split_once('/') else {
        return false;
    };
    let month_ok = mm.len() == 2 && matches!(mm.parse::<u8>(), Ok(1..=12));
    let year_ok = yy.len() == 2 && yy.chars().all(|c| c.is_ascii_digit());
    month_ok && year_ok
}
