//! Vendor XMP field lookup.
//!
//! Values are accepted in attribute form `drone-dji:Key="value"` and in
//! element form `<drone-dji:Key>value</drone-dji:Key>`. Nothing here
//! fails: an absent or malformed field is reported as `None`.

use super::DewarpParams;
use crate::math::DMat3;

pub const NAMESPACE_PREFIX: &str = "drone-dji:";

pub const KEY_CAPTURE_UUID: &str = "CaptureUUID";
pub const KEY_CALIBRATED_CENTER_X: &str = "CalibratedOpticalCenterX";
pub const KEY_CALIBRATED_CENTER_Y: &str = "CalibratedOpticalCenterY";
pub const KEY_RELATIVE_CENTER_X: &str = "RelativeOpticalCenterX";
pub const KEY_RELATIVE_CENTER_Y: &str = "RelativeOpticalCenterY";
pub const KEY_DEWARP_DATA: &str = "DewarpData";
pub const KEY_DEWARP_H_MATRIX: &str = "DewarpHMatrix";

/// Raw text of the first well-formed occurrence of `key`, trimmed.
pub fn find_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let name = format!("{NAMESPACE_PREFIX}{key}");
    let mut search_from = 0;

    while let Some(pos) = text[search_from..].find(&name) {
        let start = search_from + pos;
        let after = start + name.len();
        search_from = after;

        let preceding = text[..start].chars().next_back();
        let rest = &text[after..];

        let value = match preceding {
            Some('<') => element_value(rest, &name),
            Some('/') => None,
            None => attribute_value(rest),
            Some(c) if c.is_whitespace() => attribute_value(rest),
            Some(_) => None,
        };

        if let Some(value) = value {
            return Some(value.trim());
        }
    }

    None
}

/// `="value"` or `='value'`, with optional whitespace around `=`.
fn attribute_value(rest: &str) -> Option<&str> {
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &rest[quote.len_utf8()..];
    let end = body.find(quote)?;
    Some(&body[..end])
}

/// `>value</name>`
fn element_value<'a>(rest: &'a str, name: &str) -> Option<&'a str> {
    let body = rest.trim_start().strip_prefix('>')?;
    let closing = format!("</{name}>");
    let end = body.find(&closing)?;
    Some(&body[..end])
}

pub fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Comma-separated floats. Any element that does not parse invalidates the
/// whole list; a single trailing separator is tolerated.
pub fn parse_f64_list(value: &str) -> Option<Vec<f64>> {
    let value = value.trim();
    let value = value.strip_suffix(',').unwrap_or(value);
    if value.is_empty() {
        return None;
    }
    value.split(',').map(parse_f64).collect()
}

/// `<prefix>;fx,fy,cx,cy,k1,k2,p1,p2,k3[,...]`
///
/// The prefix before the first `;` (a calibration date in practice) is
/// ignored. Only the first nine values are read; whatever follows them,
/// malformed or not, is ignored.
pub fn parse_dewarp_data(value: &str) -> Option<DewarpParams> {
    let (_, params) = value.split_once(';')?;
    let v: Vec<f64> = params
        .split(',')
        .take(9)
        .map(parse_f64)
        .collect::<Option<_>>()?;
    let v: [f64; 9] = v.try_into().ok()?;
    Some(DewarpParams {
        fx: v[0],
        fy: v[1],
        cx: v[2],
        cy: v[3],
        k1: v[4],
        k2: v[5],
        p1: v[6],
        p2: v[7],
        k3: v[8],
    })
}

/// Exactly nine row-major values.
pub fn parse_h_matrix(value: &str) -> Option<DMat3> {
    let v = parse_f64_list(value)?;
    let data: [f64; 9] = v.try_into().ok()?;
    Some(DMat3::from_array(data))
}
