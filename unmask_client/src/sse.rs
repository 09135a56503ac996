use serde_json::Value;

use crate::error::UnmaskError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub data: String,
}

/// Splits a fully received `text/event-stream` body into events.
pub fn parse_events(body: &str) -> Vec<Event> {
    let mut events = Vec::new();
    let mut name: Option<String> = None;
    let mut data: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.is_empty() {
            flush(&mut events, &mut name, &mut data);
            continue;
        }
        if line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => name = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }
    flush(&mut events, &mut name, &mut data);

    events
}

fn flush(events: &mut Vec<Event>, name: &mut Option<String>, data: &mut Vec<&str>) {
    if name.is_none() && data.is_empty() {
        return;
    }
    events.push(Event {
        name: name.take().unwrap_or_else(|| "message".to_string()),
        data: data.join("\n"),
    });
    data.clear();
}

/// Output values of the first `complete` event. An `error` event before it fails the call.
pub fn completion(events: &[Event]) -> Result<Vec<Value>, UnmaskError> {
    for event in events {
        match event.name.as_str() {
            "complete" => return Ok(serde_json::from_str(&event.data)?),
            "error" => return Err(UnmaskError::Remote(event.data.clone())),
            _ => {}
        }
    }
    Err(UnmaskError::UnexpectedOutput(
        "event stream ended without a complete event".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_heartbeats_and_completion() {
        let body = "event: heartbeat\ndata: null\n\nevent: complete\ndata: [{\"label\": \"Kyiv\", \"confidences\": []}]\n\n";
        let events = parse_events(body);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "heartbeat");
        assert_eq!(
            completion(&events).unwrap(),
            vec![json!({"label": "Kyiv", "confidences": []})]
        );
    }

    #[test]
    fn joins_multiline_data_and_ignores_comments() {
        let events = parse_events(": keep-alive\nevent: complete\ndata: [1,\ndata: 2]\n");
        assert_eq!(
            events,
            vec![Event {
                name: "complete".into(),
                data: "[1,\n2]".into()
            }]
        );
        assert_eq!(completion(&events).unwrap(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn error_event_fails_the_call() {
        let events = parse_events("event: error\ndata: \"GPU task aborted\"\n\n");
        match completion(&events) {
            Err(UnmaskError::Remote(message)) => assert_eq!(message, "\"GPU task aborted\""),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_completion_is_reported() {
        let events = parse_events("event: generating\ndata: []\n\n");
        assert!(matches!(
            completion(&events),
            Err(UnmaskError::UnexpectedOutput(_))
        ));
    }
}
