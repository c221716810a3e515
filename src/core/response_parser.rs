use serde_json::{Map, Value};

use super::errors::CoreError;
use super::models::{ExtractionResult, Recommendation};

const REQUIRED_FIELDS: [&str; 7] = [
    "fullName",
    "email",
    "yearsOfExperience",
    "hasNebosh",
    "hasLevel6",
    "hasAdosh",
    "recommendation",
];

/// Validates the model's JSON text and coerces it into a strict `ExtractionResult`.
///
/// Missing required fields and non-JSON payloads are shape errors; present fields with the
/// wrong type or an out-of-vocabulary value are reported as `UnexpectedValue`.
pub fn parse_extraction(raw: &str) -> Result<ExtractionResult, CoreError> {
    let text = strip_json_fences(raw);
    let value: Value =
        serde_json::from_str(text).map_err(|err| CoreError::ResponseShape(err.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(CoreError::ResponseShape(
            "expected a JSON object".to_string(),
        ));
    };

    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .find(|name| fields.get(**name).map_or(true, Value::is_null))
    {
        return Err(CoreError::ResponseShape(format!(
            "missing required field {missing}"
        )));
    }

    let years_of_experience = number_field(&fields, "yearsOfExperience")?;
    if !years_of_experience.is_finite() || years_of_experience < 0.0 {
        return Err(CoreError::UnexpectedValue {
            field: "yearsOfExperience",
            value: years_of_experience.to_string(),
        });
    }

    let recommendation_label = string_field(&fields, "recommendation")?;
    let recommendation = Recommendation::from_label(&recommendation_label).ok_or_else(|| {
        CoreError::UnexpectedValue {
            field: "recommendation",
            value: recommendation_label.clone(),
        }
    })?;

    Ok(ExtractionResult {
        full_name: string_field(&fields, "fullName")?,
        email: string_field(&fields, "email")?,
        phone: string_field(&fields, "phone")?,
        technical_skills: string_list_field(&fields, "technicalSkills")?,
        years_of_experience,
        highest_degree: string_field(&fields, "highestDegree")?,
        has_nebosh: bool_field(&fields, "hasNebosh")?,
        has_level6: bool_field(&fields, "hasLevel6")?,
        has_adosh: bool_field(&fields, "hasAdosh")?,
        nature_of_experience_found: string_list_field(&fields, "natureOfExperienceFound")?,
        summary: string_field(&fields, "summary")?,
        recommendation,
        key_strengths: string_list_field(&fields, "keyStrengths")?,
    })
}

/// Strips ```json ... ``` or ``` ... ``` fences some model responses wrap around JSON.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };

    let stripped = stripped.trim_start();
    stripped
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(stripped)
}

fn unexpected(field: &'static str, value: &Value) -> CoreError {
    CoreError::UnexpectedValue {
        field,
        value: value.to_string(),
    }
}

fn string_field(fields: &Map<String, Value>, name: &'static str) -> Result<String, CoreError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(value)) => Ok(value.trim().to_string()),
        Some(other) => Err(unexpected(name, other)),
    }
}

fn number_field(fields: &Map<String, Value>, name: &'static str) -> Result<f64, CoreError> {
    match fields.get(name) {
        Some(Value::Number(number)) => number.as_f64().ok_or_else(|| CoreError::UnexpectedValue {
            field: name,
            value: number.to_string(),
        }),
        Some(other) => Err(unexpected(name, other)),
        None => Err(CoreError::ResponseShape(format!(
            "missing required field {name}"
        ))),
    }
}

fn bool_field(fields: &Map<String, Value>, name: &'static str) -> Result<bool, CoreError> {
    match fields.get(name) {
        Some(Value::Bool(value)) => Ok(*value),
        Some(other) => Err(unexpected(name, other)),
        None => Err(CoreError::ResponseShape(format!(
            "missing required field {name}"
        ))),
    }
}

fn string_list_field(
    fields: &Map<String, Value>,
    name: &'static str,
) -> Result<Vec<String>, CoreError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(value) => Ok(value.clone()),
                other => Err(unexpected(name, other)),
            })
            .collect(),
        Some(other) => Err(unexpected(name, other)),
    }
}
