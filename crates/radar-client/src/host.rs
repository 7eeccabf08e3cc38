// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Host element the widget is mounted on.
//!
//! Carries string configuration attributes and a lifecycle token. Removing
//! the host cancels the token, which ends any refresh schedule bound to it.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

/// Attribute holding the configured latitude
pub const LAT_ATTRIBUTE: &str = "lat";
/// Attribute holding the configured longitude
pub const LON_ATTRIBUTE: &str = "lon";

#[derive(Debug, Clone, Default)]
pub struct HostElement {
    attributes: HashMap<String, String>,
    lifecycle: CancellationToken,
}

impl HostElement {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Set an attribute only when a value is present
    #[must_use]
    pub fn with_optional_attribute(self, name: &str, value: Option<String>) -> Self {
        match value {
            Some(value) => self.with_attribute(name, value),
            None => self,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Parse an attribute as a finite coordinate value.
    ///
    /// Reads the longest numeric prefix after leading whitespace, so
    /// `"40.5deg"` is 40.5. Missing values, values without a numeric prefix,
    /// NaN and infinities all yield `None`.
    pub fn coordinate(&self, name: &str) -> Option<f64> {
        self.attribute(name)
            .and_then(leading_number)
            .filter(|value| value.is_finite())
    }

    /// Detach the host. Clones observe the removal too.
    pub fn remove(&self) {
        self.lifecycle.cancel();
    }

    pub fn is_attached(&self) -> bool {
        !self.lifecycle.is_cancelled()
    }

    /// Resolves once the host has been removed.
    pub async fn removed(&self) {
        self.lifecycle.cancelled().await;
    }
}

/// Decimal number at the start of `raw`: sign, digits, fraction, exponent.
/// An exponent marker without digits is left out of the prefix.
fn leading_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        start + bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integer_end = digits_from(end);
    let mut digit_count = integer_end - end;
    end = integer_end;

    if bytes.get(end) == Some(&b'.') {
        let fraction_end = digits_from(end + 1);
        digit_count += fraction_end - (end + 1);
        end = fraction_end;
    }
    if digit_count == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent_start = end + 1;
        if matches!(bytes.get(exponent_start), Some(b'+' | b'-')) {
            exponent_start += 1;
        }
        let exponent_end = digits_from(exponent_start);
        if exponent_end > exponent_start {
            end = exponent_end;
        }
    }

    text[..end].parse().ok()
}
