//! Simulated pix charge.
//!
//! The code is a syntactically valid BR Code (EMV merchant-presented payload
//! with a CRC16 trailer) built from random data. Nothing is registered with a
//! payment institution; confirmation is a fixed countdown.

use rand::distributions::Alphanumeric;
use rand::Rng;

const GUI: &str = "br.gov.bcb.pix";
const MERCHANT_NAME: &str = "PICNODE";
const MERCHANT_CITY: &str = "SAO PAULO";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixTick {
    /// Seconds left before the simulated confirmation.
    Remaining(u32),
    /// The countdown reached zero on this tick.
    Confirmed,
    /// Already confirmed earlier; nothing happens.
    Idle,
}

#[derive(Debug, Clone)]
pub struct PixCharge {
    code: String,
    remaining_secs: u32,
    confirmed: bool,
}

impl PixCharge {
    pub fn new(amount: Option<f64>, countdown_secs: u32) -> Self {
        Self {
            code: generate_code(amount),
            remaining_secs: countdown_secs,
            confirmed: false,
        }
    }

    /// Copy-and-paste payload; QR rendering is left to the presentation layer.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Advance the countdown by one second. `Confirmed` is returned exactly once.
    pub fn tick(&mut self) -> PixTick {
        if self.confirmed {
            return PixTick::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.confirmed = true;
            PixTick::Confirmed
        } else {
            PixTick::Remaining(self.remaining_secs)
        }
    }
}

fn tlv(id: &str, value: &str) -> String {
    format!("{}{:02}{}", id, value.len(), value)
}

pub fn generate_code(amount: Option<f64>) -> String {
    let key = uuid::Uuid::new_v4().to_string();
    let txid: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(25)
        .map(char::from)
        .collect();

    let mut payload = String::new();
    payload.push_str(&tlv("00", "01"));
    payload.push_str(&tlv("26", &format!("{}{}", tlv("00", GUI), tlv("01", &key))));
    payload.push_str(&tlv("52", "0000"));
    payload.push_str(&tlv("53", "986"));
    if let Some(amount) = amount.filter(|a| *a > 0.0) {
        payload.push_str(&tlv("54", &format!("{:.2}", amount)));
    }
    payload.push_str(&tlv("58", "BR"));
    payload.push_str(&tlv("59", MERCHANT_NAME));
    payload.push_str(&tlv("60", MERCHANT_CITY));
    payload.push_str(&tlv("62", &tlv("05", &txid)));
    payload.push_str("6304");

    let crc = crc16_ccitt(payload.as_bytes());
    format!("{}{:04X}", payload, crc)
}

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF), as used by BR Code.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}
