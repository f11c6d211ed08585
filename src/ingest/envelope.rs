/// One demultiplexed streaming event, addressed to a single market's actor.
#[derive(Debug, Clone, PartialEq)]
pub struct MsgEnvelope {
    pub market: String,
    /// Normalized to seconds at ingress (`ts > 1e11` divided by 1000).
    pub timestamp: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
}

/// Normalize a raw wire timestamp: values above `1e11` are assumed to be
/// milliseconds and divided down to seconds. Applied once at ingress so
/// nothing downstream re-interprets raw wire timestamps.
#[must_use]
pub fn normalize_timestamp(raw: f64) -> i64 {
    if raw > 1e11 {
        (raw / 1000.0) as i64
    } else {
        raw as i64
    }
}

/// Parse one incoming text frame into zero or more envelopes. A JSON object
/// is one event; a JSON array is flattened into individual events.
/// Non-JSON or events missing `market`/`timestamp`/`event_type` are
/// discarded (caller increments a malformed-frame counter).
#[must_use]
pub fn parse_frame(text: &str) -> Vec<MsgEnvelope> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return vec![];
    };
    let events: Vec<serde_json::Value> = match value {
        serde_json::Value::Array(items) => items,
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => vec![],
    };

    events
        .into_iter()
        .filter_map(|event| {
            let market = event.get("market")?.as_str()?.to_string();
            let timestamp = event.get("timestamp")?.as_f64()?;
            let event_type = event.get("event_type")?.as_str()?.to_string();
            Some(MsgEnvelope {
                market,
                timestamp: normalize_timestamp(timestamp),
                event_type,
                payload: event,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millisecond_timestamps_are_normalized() {
        assert_eq!(normalize_timestamp(1_700_000_000_000.0), 1_700_000_000);
    }

    #[test]
    fn second_timestamps_pass_through() {
        assert_eq!(normalize_timestamp(1_700_000_000.0), 1_700_000_000);
    }

    #[test]
    fn object_frame_yields_one_event() {
        let frame = r#"{"market":"m1","timestamp":1700000000,"event_type":"price_change"}"#;
        let events = parse_frame(frame);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].market, "m1");
    }

    #[test]
    fn array_frame_is_flattened() {
        let frame = r#"[
            {"market":"m1","timestamp":1,"event_type":"price_change"},
            {"market":"m2","timestamp":2,"event_type":"book"}
        ]"#;
        let events = parse_frame(frame);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn non_json_frame_is_discarded() {
        assert!(parse_frame("not json").is_empty());
    }

    #[test]
    fn event_missing_required_field_is_discarded() {
        let frame = r#"{"market":"m1","event_type":"price_change"}"#;
        assert!(parse_frame(frame).is_empty());
    }
}
