// SPDX-License-Identifier: GPL-3.0-only

//! Reading the rating back out of critique text

use crate::constants::gallery::MAX_RATING;

/// A critique split into the parts the prompt asks for
///
/// The model is asked for `Rating: n` and `Feedback: ...` lines but nothing
/// guarantees it complies, so both parts are optional and the raw text is
/// always kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Critique {
    pub rating: Option<u8>,
    pub feedback: Option<String>,
    pub raw: String,
}

impl Critique {
    pub fn parse(text: &str) -> Self {
        let mut rating = None;
        let mut feedback: Option<Vec<&str>> = None;

        for line in text.lines() {
            let cleaned = line.trim().trim_start_matches(['*', '#', '-', ' ']);

            if let Some(rest) = strip_label(cleaned, "rating") {
                if rating.is_none() {
                    rating = parse_rating(rest);
                }
            } else if let Some(rest) = strip_label(cleaned, "feedback") {
                feedback = Some(vec![rest]);
            } else if let Some(lines) = feedback.as_mut() {
                let line = line.trim();
                if !line.is_empty() {
                    lines.push(line);
                }
            }
        }

        Self {
            rating,
            feedback: feedback
                .map(|lines| lines.join(" ").trim().to_string())
                .filter(|text| !text.is_empty()),
            raw: text.to_string(),
        }
    }
}

/// Text after `label:`, tolerating markdown bold around the label
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    let rest = line[label.len()..].trim_start_matches('*').trim_start();
    rest.strip_prefix(':')
        .map(|rest| rest.trim_start_matches('*').trim())
}

fn parse_rating(text: &str) -> Option<u8> {
    let digits: String = text
        .trim_start_matches(['[', '(', ' '])
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let value: u32 = digits.parse().ok()?;
    Some(value.min(u32::from(MAX_RATING)) as u8)
}
