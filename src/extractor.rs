use serde_json::Value;
use thiserror::Error;

use crate::models::NutritionEstimate;

/// Extraction failures always carry the original model text so the UI can
/// show it for diagnosis.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no structured payload found in model response")]
    NoPayload { raw: String },
    #[error("malformed payload in model response: {source}")]
    Malformed {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ExtractionError {
    pub fn raw_text(&self) -> &str {
        match self {
            ExtractionError::NoPayload { raw } => raw,
            ExtractionError::Malformed { raw, .. } => raw,
        }
    }
}

/// Locates the JSON object embedded in the model's free-form reply and
/// normalizes it into a fully populated estimate.
///
/// The payload boundary is a deliberate heuristic: everything between the
/// first `{` and the last `}`. The prompt asks the model for a lone JSON
/// object, so this holds whenever the reply contains exactly one
/// brace-delimited structure, commentary and code fences included.
///
/// Payload location and parse failures propagate; per-field problems do
/// not. A missing or non-numeric field becomes its default instead of an
/// error, because a partial estimate is still useful to display.
pub fn extract_record(raw: &str) -> Result<NutritionEstimate, ExtractionError> {
    let start = match raw.find('{') {
        Some(i) => i,
        None => {
            return Err(ExtractionError::NoPayload {
                raw: raw.to_string(),
            })
        }
    };
    let candidate = match raw.rfind('}') {
        Some(end) if end >= start => &raw[start..=end],
        _ => {
            return Err(ExtractionError::NoPayload {
                raw: raw.to_string(),
            })
        }
    };

    let value: Value =
        serde_json::from_str(candidate).map_err(|source| ExtractionError::Malformed {
            raw: raw.to_string(),
            source,
        })?;

    log::debug!("✅ Parsed payload from model response ({} bytes)", candidate.len());

    Ok(NutritionEstimate {
        calories_kcal: safe_numeric(value.get("calories_kcal")),
        protein_g: safe_numeric(value.get("protein_g")),
        fat_g: safe_numeric(value.get("fat_g")),
        carbs_g: safe_numeric(value.get("carbs_g")),
        fiber_g: safe_numeric(value.get("fiber_g")),
        estimated_portion: value
            .get("estimated_portion")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "N/A".to_string()),
        confidence: safe_numeric(value.get("confidence")),
    })
}

/// Best-effort numeric coercion. Accepts JSON numbers and numeric strings
/// ("250", "12.5"); anything else, including an absent key, yields 0.0.
fn safe_numeric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Removes markdown decoration (heading markers, horizontal rules,
/// bold/italic stars, bullet markers) and trims the result.
///
/// Run on the copy of the reply headed for display or speech, never on the
/// copy handed to [`extract_record`]: stripping braces-adjacent punctuation
/// could corrupt the JSON payload.
pub fn strip_formatting(text: &str) -> String {
    // One stripping pass can expose new decoration (a star run hiding a
    // dash pair), so iterate to a fixpoint. Output is stable under
    // repeated application.
    let mut current = strip_once(text);
    loop {
        let next = strip_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn strip_once(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&strip_line(line));
    }
    out.trim().to_string()
}

fn strip_line(line: &str) -> String {
    let mut rest = line.trim_start();
    // Leading bullet markers, possibly nested.
    loop {
        let stripped = rest
            .strip_prefix('-')
            .or_else(|| rest.strip_prefix('*'))
            .filter(|r| r.is_empty() || r.starts_with(char::is_whitespace));
        match stripped {
            Some(r) => rest = r.trim_start(),
            None => break,
        }
    }

    let chars: Vec<char> = rest.chars().collect();
    let mut out = String::with_capacity(rest.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '#' => {
                while i < chars.len() && chars[i] == '#' {
                    i += 1;
                }
                while i < chars.len() && chars[i] == ' ' {
                    i += 1;
                }
            }
            '*' | '@' => {
                let marker = chars[i];
                while i < chars.len() && chars[i] == marker {
                    i += 1;
                }
            }
            '-' if i + 1 < chars.len() && chars[i + 1] == '-' => {
                while i < chars.len() && chars[i] == '-' {
                    i += 1;
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_embedded_payload() {
        let raw = "Sure! Here is the analysis: {\"calories_kcal\": 250, \"protein_g\": 12, \
                   \"fat_g\": 8, \"carbs_g\": 30, \"fiber_g\": 3, \
                   \"estimated_portion\": \"1 bowl\", \"confidence\": 0.9} Hope this helps!";
        let estimate = extract_record(raw).unwrap();

        assert_eq!(estimate.calories_kcal, 250.0);
        assert_eq!(estimate.protein_g, 12.0);
        assert_eq!(estimate.fat_g, 8.0);
        assert_eq!(estimate.carbs_g, 30.0);
        assert_eq!(estimate.fiber_g, 3.0);
        assert_eq!(estimate.estimated_portion, "1 bowl");
        assert_eq!(estimate.confidence, 0.9);
        assert_eq!(estimate.confidence_band().to_string(), "high");
    }

    #[test]
    fn test_extract_inside_code_fence() {
        let raw = "```json\n{\"calories_kcal\": 120, \"confidence\": 0.6}\n```";
        let estimate = extract_record(raw).unwrap();
        assert_eq!(estimate.calories_kcal, 120.0);
        assert_eq!(estimate.confidence_band().to_string(), "medium");
    }

    #[test]
    fn test_no_brace_is_no_payload() {
        let err = extract_record("I could not identify any food.").unwrap_err();
        assert!(matches!(err, ExtractionError::NoPayload { .. }));
        assert_eq!(err.raw_text(), "I could not identify any food.");
    }

    #[test]
    fn test_unclosed_brace_is_no_payload() {
        let err = extract_record("here you go: {\"calories_kcal\": 1").unwrap_err();
        assert!(matches!(err, ExtractionError::NoPayload { .. }));
    }

    #[test]
    fn test_malformed_payload_carries_raw_text() {
        let raw = "analysis: {calories: not json}";
        let err = extract_record(raw).unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { .. }));
        assert_eq!(err.raw_text(), raw);
    }

    #[test]
    fn test_missing_fields_default_and_present_fields_survive() {
        let raw = "{\"calories_kcal\": 410, \"protein_g\": 22.5}";
        let estimate = extract_record(raw).unwrap();
        assert_eq!(estimate.calories_kcal, 410.0);
        assert_eq!(estimate.protein_g, 22.5);
        assert_eq!(estimate.fiber_g, 0.0);
        assert_eq!(estimate.carbs_g, 0.0);
        assert_eq!(estimate.estimated_portion, "N/A");
        assert_eq!(estimate.confidence, 0.0);
        assert_eq!(estimate.confidence_band().to_string(), "low");
    }

    #[test]
    fn test_non_numeric_field_defaults_to_zero() {
        let raw = "{\"calories_kcal\": \"lots\", \"fat_g\": 9}";
        let estimate = extract_record(raw).unwrap();
        assert_eq!(estimate.calories_kcal, 0.0);
        assert_eq!(estimate.fat_g, 9.0);
    }

    #[test]
    fn test_numeric_string_is_coerced() {
        let raw = "{\"calories_kcal\": \"250\", \"confidence\": \"0.85\"}";
        let estimate = extract_record(raw).unwrap();
        assert_eq!(estimate.calories_kcal, 250.0);
        assert_eq!(estimate.confidence_band().to_string(), "high");
    }

    #[test]
    fn test_strip_formatting_removes_decoration() {
        let text = "### Analysis\n---\n**Grilled chicken** with *rice*\n- tender\n- lean";
        let cleaned = strip_formatting(text);
        assert_eq!(cleaned, "Analysis\n\nGrilled chicken with rice\ntender\nlean");
    }

    #[test]
    fn test_strip_formatting_is_idempotent() {
        let samples = [
            "### Heading\n--- \n**bold** *italic* @@\n- bullet one\n  * bullet two",
            "plain text, nothing to strip",
            "-*- mixed -*-",
            "- - nested bullet",
            "",
        ];
        for sample in samples {
            let once = strip_formatting(sample);
            assert_eq!(strip_formatting(&once), once, "input: {:?}", sample);
        }
    }

    #[test]
    fn test_strip_formatting_keeps_hyphenated_words() {
        assert_eq!(strip_formatting("stir-fried noodles"), "stir-fried noodles");
    }
}
