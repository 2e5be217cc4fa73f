//! Sheets range access: read, append and update against one range.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// Rows of cell values. Rows may differ in length.
pub type RangeValues = Vec<Vec<Value>>;

/// How Google interprets written values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueInputOption {
    /// Stored as-is
    Raw,
    /// Parsed as if typed into the UI: formulas, dates and numbers are interpreted
    UserEntered,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

/// `spreadsheets.values.get` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub major_dimension: Option<String>,
    /// Omitted by Google when the range is empty
    #[serde(default)]
    pub values: Option<RangeValues>,
}

#[async_trait]
pub trait SheetsApi: Send + Sync {
    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange>;

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &RangeValues,
        input_option: ValueInputOption,
    ) -> Result<Value>;

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &RangeValues,
        input_option: ValueInputOption,
    ) -> Result<Value>;
}

fn require<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(GatewayError::MissingParameter(name.to_string())),
    }
}

/// Check that `values` is a non-empty array of rows, each row itself an array.
pub fn validate_values(values: Option<&Value>) -> Result<RangeValues> {
    let values = values
        .filter(|v| !v.is_null())
        .ok_or_else(|| GatewayError::MissingParameter("values".to_string()))?;

    let rows = values.as_array().ok_or_else(|| {
        GatewayError::ShapeValidation("values must be a 2D array of rows".to_string())
    })?;

    if rows.is_empty() {
        return Err(GatewayError::ShapeValidation(
            "values must contain at least one row".to_string(),
        ));
    }

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            row.as_array().cloned().ok_or_else(|| {
                GatewayError::ShapeValidation(format!("row {} of values is not an array", i))
            })
        })
        .collect()
}

/// Read a range. An empty range yields `[]`.
pub async fn read<S>(sheets: &S, spreadsheet_id: Option<&str>, range: Option<&str>) -> Result<RangeValues>
where
    S: SheetsApi + ?Sized,
{
    let spreadsheet_id = require("spreadsheetId", spreadsheet_id)?;
    let range = require("range", range)?;

    let value_range = sheets.get_values(spreadsheet_id, range).await?;
    Ok(value_range.values.unwrap_or_default())
}

/// Append rows after the last populated row of `range`.
///
/// Not idempotent: repeating the call appends the rows again.
pub async fn append<S>(
    sheets: &S,
    spreadsheet_id: Option<&str>,
    range: Option<&str>,
    values: Option<&Value>,
) -> Result<Value>
where
    S: SheetsApi + ?Sized,
{
    let spreadsheet_id = require("spreadsheetId", spreadsheet_id)?;
    let range = require("range", range)?;
    let values = validate_values(values)?;

    let response = sheets
        .append_values(spreadsheet_id, range, &values, ValueInputOption::UserEntered)
        .await?;
    tracing::info!("[OK] Appended {} rows to {}", values.len(), range);
    Ok(response)
}

/// Overwrite `range` with `values`.
pub async fn update<S>(
    sheets: &S,
    spreadsheet_id: Option<&str>,
    range: Option<&str>,
    values: Option<&Value>,
) -> Result<Value>
where
    S: SheetsApi + ?Sized,
{
    let spreadsheet_id = require("spreadsheetId", spreadsheet_id)?;
    let range = require("range", range)?;
    let values = validate_values(values)?;

    let response = sheets
        .update_values(spreadsheet_id, range, &values, ValueInputOption::UserEntered)
        .await?;
    tracing::info!("[OK] Updated {} with {} rows", range, values.len());
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Get(String, String),
        Append(String, String, RangeValues, ValueInputOption),
        Update(String, String, RangeValues, ValueInputOption),
    }

    #[derive(Default)]
    struct MockSheets {
        stored: Option<RangeValues>,
        calls: Mutex<Vec<Call>>,
    }

    impl MockSheets {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SheetsApi for MockSheets {
        async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Get(spreadsheet_id.into(), range.into()));
            Ok(ValueRange {
                range: Some(range.to_string()),
                major_dimension: Some("ROWS".to_string()),
                values: self.stored.clone(),
            })
        }

        async fn append_values(
            &self,
            spreadsheet_id: &str,
            range: &str,
            values: &RangeValues,
            input_option: ValueInputOption,
        ) -> Result<Value> {
            self.calls.lock().unwrap().push(Call::Append(
                spreadsheet_id.into(),
                range.into(),
                values.clone(),
                input_option,
            ));
            Ok(json!({
                "spreadsheetId": spreadsheet_id,
                "updates": { "updatedRange": "Sheet1!A5:B5", "updatedRows": 1 }
            }))
        }

        async fn update_values(
            &self,
            spreadsheet_id: &str,
            range: &str,
            values: &RangeValues,
            input_option: ValueInputOption,
        ) -> Result<Value> {
            self.calls.lock().unwrap().push(Call::Update(
                spreadsheet_id.into(),
                range.into(),
                values.clone(),
                input_option,
            ));
            Ok(json!({ "spreadsheetId": spreadsheet_id, "updatedRange": range }))
        }
    }

    #[tokio::test]
    async fn test_append_issues_one_user_entered_call() {
        let sheets = MockSheets::default();
        let values = json!([["a", "b"]]);

        let response = append(&sheets, Some("id1"), Some("Sheet1!A1"), Some(&values))
            .await
            .unwrap();

        assert_eq!(
            sheets.calls(),
            vec![Call::Append(
                "id1".into(),
                "Sheet1!A1".into(),
                vec![vec![json!("a"), json!("b")]],
                ValueInputOption::UserEntered
            )]
        );
        assert_eq!(
            response,
            json!({
                "spreadsheetId": "id1",
                "updates": { "updatedRange": "Sheet1!A5:B5", "updatedRows": 1 }
            })
        );
    }

    #[tokio::test]
    async fn test_append_rejects_non_array_without_calling_vendor() {
        let sheets = MockSheets::default();
        let values = json!("not-an-array");

        let err = append(&sheets, Some("id1"), Some("Sheet1!A1"), Some(&values))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::ShapeValidation(_)));
        assert!(sheets.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_rejects_flat_array() {
        let sheets = MockSheets::default();
        let values = json!(["a", "b"]);

        let err = update(&sheets, Some("id1"), Some("Sheet1!A1"), Some(&values))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::ShapeValidation(_)));
        assert!(sheets.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_accepts_jagged_rows() {
        let sheets = MockSheets::default();
        let values = json!([["Name", "Qty", "Price"], ["Apples", 3], ["=SUM(B2:B3)"]]);

        update(&sheets, Some("id1"), Some("Sheet1!A1:C3"), Some(&values))
            .await
            .unwrap();

        match &sheets.calls()[0] {
            Call::Update(_, range, rows, option) => {
                assert_eq!(range, "Sheet1!A1:C3");
                assert_eq!(rows.len(), 3);
                assert_eq!(rows[1], vec![json!("Apples"), json!(3)]);
                assert_eq!(*option, ValueInputOption::UserEntered);
            }
            other => panic!("Expected update call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_empty_range_is_empty_array() {
        let sheets = MockSheets::default();

        let values = read(&sheets, Some("id1"), Some("Sheet1!A1:B2")).await.unwrap();

        assert!(values.is_empty());
        assert_eq!(serde_json::to_value(&values).unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_read_returns_rows() {
        let sheets = MockSheets {
            stored: Some(vec![vec![json!("a"), json!(1)]]),
            ..Default::default()
        };

        let values = read(&sheets, Some("id1"), Some("Sheet1")).await.unwrap();
        assert_eq!(values, vec![vec![json!("a"), json!(1)]]);
    }

    #[tokio::test]
    async fn test_missing_parameters_fail_fast() {
        let sheets = MockSheets::default();

        let err = read(&sheets, None, Some("Sheet1")).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingParameter(ref p) if p == "spreadsheetId"));

        let err = read(&sheets, Some("id1"), Some("   ")).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingParameter(ref p) if p == "range"));

        let err = append(&sheets, Some("id1"), Some("Sheet1"), None).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingParameter(ref p) if p == "values"));

        assert!(sheets.calls().is_empty());
    }

    #[test]
    fn test_validate_values_shapes() {
        assert!(validate_values(Some(&json!([["a"]]))).is_ok());
        assert!(matches!(
            validate_values(Some(&json!([]))),
            Err(GatewayError::ShapeValidation(_))
        ));
        assert!(matches!(
            validate_values(Some(&json!([["a"], "b"]))),
            Err(GatewayError::ShapeValidation(_))
        ));
        assert!(matches!(
            validate_values(Some(&json!({"a": 1}))),
            Err(GatewayError::ShapeValidation(_))
        ));
        assert!(matches!(
            validate_values(Some(&Value::Null)),
            Err(GatewayError::MissingParameter(_))
        ));
    }
}
