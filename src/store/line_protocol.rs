use crate::store::{FieldValue, Point};

pub fn encode_point(point: &Point) -> String {
    let mut line = escape(point.measurement(), &[',', ' ']);
    for (key, value) in point.tags() {
        // the store keeps no empty tag values
        if value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&escape(key, &[',', '=', ' ']));
        line.push('=');
        line.push_str(&escape(value, &[',', '=', ' ']));
    }
    line.push(' ');
    let fields: Vec<String> = point
        .fields()
        .iter()
        .map(|(key, value)| format!("{}={}", escape(key, &[',', '=', ' ']), encode_field(value)))
        .collect();
    line.push_str(&fields.join(","));
    line.push(' ');
    line.push_str(&point.timestamp_nanos().to_string());
    line
}

pub fn encode_batch(points: &[Point]) -> String {
    points
        .iter()
        .map(encode_point)
        .collect::<Vec<_>>()
        .join("\n")
}

fn encode_field(value: &FieldValue) -> String {
    match value {
        FieldValue::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        FieldValue::Integer(i) => format!("{i}i"),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Boolean(b) => b.to_string(),
    }
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    #[test]
    fn escapes_each_component_by_its_rules() {
        let tags = BTreeMap::from([
            ("cluster_id".to_string(), "c 1,a=b".to_string()),
            ("source_host".to_string(), String::new()),
        ]);
        let fields = BTreeMap::from([
            ("message".to_string(), FieldValue::from(r#"disk "full" \o/"#)),
            ("n".to_string(), FieldValue::Integer(-2)),
            ("ok".to_string(), FieldValue::Boolean(true)),
            ("ratio".to_string(), FieldValue::Float(0.5)),
        ]);
        let t = Utc.timestamp_opt(1_771_545_600, 5).unwrap();
        let point = Point::new("my event", tags, fields, t).unwrap();
        assert_eq!(
            encode_point(&point),
            r#"my\ event,cluster_id=c\ 1\,a\=b message="disk \"full\" \\o/",n=-2i,ok=true,ratio=0.5 1771545600000000005"#
        );
    }

    #[test]
    fn batch_is_newline_separated() {
        let t = Utc.timestamp_opt(1, 0).unwrap();
        let fields = BTreeMap::from([("id".to_string(), FieldValue::from("a"))]);
        let p = Point::new("Event", BTreeMap::new(), fields, t).unwrap();
        assert_eq!(
            encode_batch(&[p.clone(), p]),
            "Event id=\"a\" 1000000000\nEvent id=\"a\" 1000000000"
        );
    }
}
