use base64::Engine;
use serde_json::Value;
use stt_relay::relay::messages::{ClientControl, ControlReply, ServerMessage, TranscriptFrame};
use stt_relay::upstream::{
    ClientEvent, ServerEvent, SessionUpdate, TranscriptionParams, TurnDetection, UpstreamState,
};

#[test]
fn test_start_control_parsing() {
    let json = r#"{"type":"start","apiKey":"sk-test","model":"gpt-4o-transcribe"}"#;

    let ClientControl::Start {
        api_key,
        model,
        language,
    } = serde_json::from_str(json).unwrap();

    assert_eq!(api_key.as_deref(), Some("sk-test"));
    assert_eq!(model.as_deref(), Some("gpt-4o-transcribe"));
    assert_eq!(language, None);
}

#[test]
fn test_start_control_without_model() {
    let json = r#"{"type":"start","apiKey":"sk-test"}"#;

    let ClientControl::Start { api_key, model, .. } = serde_json::from_str(json).unwrap();

    assert_eq!(api_key.as_deref(), Some("sk-test"));
    assert_eq!(model, None);
}

#[test]
fn test_unknown_control_type_rejected() {
    let json = r#"{"type":"stop"}"#;
    assert!(serde_json::from_str::<ClientControl>(json).is_err());
}

#[test]
fn test_control_reply_wire_format() {
    let ack = serde_json::to_string(&ControlReply::StartAcknowledgement).unwrap();
    assert_eq!(ack, r#"{"type":"start_acknowledgement"}"#);

    let error = serde_json::to_string(&ControlReply::Error {
        message: "boom".to_string(),
    })
    .unwrap();
    assert_eq!(error, r#"{"type":"error","message":"boom"}"#);

    let closed = serde_json::to_string(&ControlReply::ConnectionClosed {
        message: "gone".to_string(),
    })
    .unwrap();
    assert_eq!(closed, r#"{"type":"connection_closed","message":"gone"}"#);
}

#[test]
fn test_transcript_frame_wire_format() {
    let delta = TranscriptFrame {
        text: "こん".to_string(),
        is_final: false,
    };
    assert_eq!(
        serde_json::to_string(&delta).unwrap(),
        r#"{"text":"こん","isFinal":false}"#
    );

    let completed = TranscriptFrame {
        text: "こんにちは".to_string(),
        is_final: true,
    };
    assert_eq!(
        serde_json::to_string(&completed).unwrap(),
        r#"{"text":"こんにちは","isFinal":true}"#
    );
}

#[test]
fn test_server_message_serialization() {
    let message = ServerMessage::Transcript(TranscriptFrame {
        text: "hello".to_string(),
        is_final: true,
    });
    let json: Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
    assert_eq!(json["text"], "hello");
    assert_eq!(json["isFinal"], true);

    let message = ServerMessage::Reply(ControlReply::StartAcknowledgement);
    let json: Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
    assert_eq!(json["type"], "start_acknowledgement");
}

#[test]
fn test_delta_event_parsing() {
    let json = r#"{"type":"conversation.item.input_audio_transcription.delta","delta":"こん"}"#;

    match serde_json::from_str::<ServerEvent>(json).unwrap() {
        ServerEvent::TranscriptionDelta { delta } => {
            assert_eq!(delta.as_deref(), Some("こん"));
        }
        other => panic!("expected a delta event, got {:?}", other),
    }
}

#[test]
fn test_completed_event_parsing() {
    let json =
        r#"{"type":"conversation.item.input_audio_transcription.completed","transcript":"こんにちは"}"#;

    match serde_json::from_str::<ServerEvent>(json).unwrap() {
        ServerEvent::TranscriptionCompleted { transcript } => {
            assert_eq!(transcript.as_deref(), Some("こんにちは"));
        }
        other => panic!("expected a completed event, got {:?}", other),
    }
}

#[test]
fn test_error_event_parsing() {
    let json = r#"{"type":"error","error":{"message":"session expired","code":"session_expired"}}"#;

    match serde_json::from_str::<ServerEvent>(json).unwrap() {
        ServerEvent::Error { error } => {
            assert_eq!(error.message.as_deref(), Some("session expired"));
        }
        other => panic!("expected an error event, got {:?}", other),
    }
}

#[test]
fn test_unknown_event_type_ignored() {
    let json = r#"{"type":"session.created","session":{"id":"sess_1"}}"#;
    assert!(matches!(
        serde_json::from_str::<ServerEvent>(json).unwrap(),
        ServerEvent::Other
    ));
}

#[test]
fn test_non_json_event_rejected() {
    assert!(serde_json::from_str::<ServerEvent>("definitely not json").is_err());
}

#[test]
fn test_session_update_wire_format() {
    let update = ClientEvent::SessionUpdate {
        session: SessionUpdate {
            input_audio_format: "pcm16".to_string(),
            input_audio_transcription: TranscriptionParams {
                model: "gpt-4o-transcribe".to_string(),
                language: "ja".to_string(),
            },
            turn_detection: TurnDetection::default(),
        },
    };

    let json: Value = serde_json::from_str(&serde_json::to_string(&update).unwrap()).unwrap();

    assert_eq!(json["type"], "transcription_session.update");
    assert_eq!(json["session"]["input_audio_format"], "pcm16");
    assert_eq!(
        json["session"]["input_audio_transcription"]["model"],
        "gpt-4o-transcribe"
    );
    assert_eq!(json["session"]["input_audio_transcription"]["language"], "ja");
    assert_eq!(json["session"]["turn_detection"]["type"], "server_vad");
    assert_eq!(json["session"]["turn_detection"]["threshold"], 0.5);
    assert_eq!(json["session"]["turn_detection"]["prefix_padding_ms"], 300);
    assert_eq!(json["session"]["turn_detection"]["silence_duration_ms"], 500);
}

#[test]
fn test_audio_append_wire_format() {
    let pcm: Vec<u8> = vec![0x01, 0x02, 0x03, 0x04];
    let append = ClientEvent::AudioAppend {
        audio: base64::engine::general_purpose::STANDARD.encode(&pcm),
    };

    let json: Value = serde_json::from_str(&serde_json::to_string(&append).unwrap()).unwrap();

    assert_eq!(json["type"], "input_audio_buffer.append");
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(json["audio"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, pcm);
}

#[test]
fn test_upstream_state_transitions() {
    use UpstreamState::*;

    // The forward path
    assert!(Idle.can_transition(Connecting));
    assert!(Connecting.can_transition(Configuring));
    assert!(Configuring.can_transition(Ready));

    // Closure is reachable from every live state
    assert!(Connecting.can_transition(Closed));
    assert!(Configuring.can_transition(Closed));
    assert!(Ready.can_transition(Closed));

    // No skipping forward, no re-entry once closed
    assert!(!Idle.can_transition(Ready));
    assert!(!Connecting.can_transition(Ready));
    assert!(!Ready.can_transition(Configuring));
    assert!(!Closed.can_transition(Ready));
    assert!(!Closed.can_transition(Connecting));
    assert!(!Closed.can_transition(Closed));
}
