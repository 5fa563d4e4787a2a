// Location verifier
//
// Protocol locations are compared as `<logical url>#<line>#<column>` strings

use crate::error::{HarnessError, HarnessResult};
use crate::scripts::ScriptTable;
use cdp_client::Location;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedLocation {
    pub url: String,
    pub line: i64,
    pub column: i64,
}

impl ExpectedLocation {
    pub fn new(url: impl Into<String>, line: i64, column: i64) -> Self {
        Self {
            url: url.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for ExpectedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}#{}", self.url, self.line, self.column)
    }
}

impl FromStr for ExpectedLocation {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // the url may itself contain '#', so split from the right
        let mut parts = s.rsplitn(3, '#');
        let column = parts.next();
        let line = parts.next();
        let url = parts.next();

        match (url, line, column) {
            (Some(url), Some(line), Some(column)) => {
                let parse = |what: &str, raw: &str| {
                    raw.parse::<i64>()
                        .map_err(|e| HarnessError::malformed("location", format!("{} {:?}: {}", what, raw, e)))
                };
                Ok(Self::new(url, parse("line", line)?, parse("column", column)?))
            }
            _ => Err(HarnessError::malformed(
                "location",
                format!("{:?} is not <url>#<line>#<column>", s),
            )),
        }
    }
}

/// Canonical string of a protocol location.
///
/// The script id must already be in the table; a missing id is a setup defect.
pub fn canonical_location(location: &Location, scripts: &ScriptTable) -> HarnessResult<String> {
    let url = scripts.url_for_script(&location.script_id).ok_or_else(|| {
        HarnessError::invalid_state(format!(
            "script id {} was never announced by Debugger.scriptParsed",
            location.script_id
        ))
    })?;
    Ok(format!(
        "{}#{}#{}",
        url,
        location.line_number,
        location.column_number.unwrap_or(0)
    ))
}

pub fn check_location(
    expected: &ExpectedLocation,
    location: &Location,
    scripts: &ScriptTable,
) -> HarnessResult<()> {
    let actual = canonical_location(location, scripts)?;
    let expected = expected.to_string();
    if actual != expected {
        return Err(HarnessError::mismatch("location", "location didn't match", expected, actual));
    }
    Ok(())
}
