use super::*;
use serde_json::{json, Value};
use shared_types::GenerationType;

fn video_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "prompt": {"type": "string", "description": "What the clip shows"},
            "mode": {"type": "string", "title": "Mode", "enum": ["text", "image"]},
            "image_url": {
                "type": "string",
                "description": "First frame [showWhen:mode=image]"
            },
            "duration": {
                "type": "integer",
                "minimum": 5,
                "maximum": 10,
                "description": "Clip length [unit:s]"
            },
            "size": {
                "anyOf": [
                    {"type": "string", "title": "Preset", "enum": ["720p", "1080p"]},
                    {
                        "type": "object",
                        "title": "Custom",
                        "properties": {
                            "width": {"type": "integer", "minimum": 64},
                            "height": {"type": "integer", "minimum": 64}
                        }
                    }
                ]
            },
            "advanced": {
                "allOf": [
                    {"type": "object", "properties": {"seed": {"type": "integer"}}},
                    {"type": "object", "properties": {"watermark": {"type": "boolean"}}}
                ]
            }
        },
        "required": ["prompt"]
    })
}

fn video_form() -> FormDefinition {
    FormDefinition::from_json(
        &video_schema(),
        GenerationType::Video,
        RenderContext {
            provider: "kling".to_string(),
            model: "kling-v2".to_string(),
        },
    )
    .unwrap()
}

fn paths(rows: &[RenderedField]) -> Vec<&str> {
    rows.iter().map(|r| r.path.as_str()).collect()
}

#[test]
fn test_state_starts_from_defaults() {
    let form = video_form();
    let state = FormState::new(&form);
    assert_eq!(
        state.values(),
        &json!({
            "prompt": "",
            "mode": "text",
            "image_url": "",
            "duration": 5,
            "size": "720p",
            "advanced": {"seed": 0, "watermark": false}
        })
    );
}

#[test]
fn test_render_hides_by_sibling_value() {
    let form = video_form();
    let mut state = FormState::new(&form);

    let rows = form.render(&state);
    assert_eq!(
        paths(&rows),
        vec!["prompt", "mode", "duration", "size", "size", "advanced.seed", "advanced.watermark"]
    );
    assert_eq!(rows[0].renderer, RendererKind::TextArea);
    assert!(rows[0].required);
    assert_eq!(rows[1].label, "Mode");
    assert_eq!(
        rows[2].renderer,
        RendererKind::Slider {
            min: 5.0,
            max: 10.0,
            step: 1.0,
            unit: Some("s".to_string())
        }
    );
    assert_eq!(rows[2].description.as_deref(), Some("Clip length"));

    state.set("mode", json!("image")).unwrap();
    let rows = form.render(&state);
    assert_eq!(rows[2].path, "image_url");
    assert_eq!(rows[2].label, "Image url");
}

#[test]
fn test_variant_selection_resets_value() {
    let form = video_form();
    let mut state = FormState::new(&form);

    let rows = form.render(&state);
    let selector = rows.iter().find(|r| r.path == "size").unwrap();
    assert_eq!(selector.selected_variant, Some(0));
    assert_eq!(
        selector.renderer,
        RendererKind::VariantSelector {
            labels: vec!["Preset".to_string(), "Custom".to_string()]
        }
    );

    state.select_variant(&form, "size", 1).unwrap();
    assert_eq!(state.get("size"), Some(&json!({"width": 64, "height": 64})));

    let rows = form.render(&state);
    let size_rows: Vec<&RenderedField> =
        rows.iter().filter(|r| r.path.starts_with("size")).collect();
    assert_eq!(size_rows.len(), 3);
    assert_eq!(size_rows[0].selected_variant, Some(1));
    assert_eq!(size_rows[1].path, "size.width");
    assert_eq!(size_rows[1].depth, 1);

    assert!(matches!(
        state.select_variant(&form, "size", 2),
        Err(FormError::UnknownVariant { index: 2, .. })
    ));
}

#[test]
fn test_field_lookup_through_branches() {
    let form = video_form();
    assert_eq!(form.fields().len(), 6);
    assert_eq!(form.field("size.width").unwrap().path, "size.width");
    assert_eq!(form.field("advanced.watermark").unwrap().renderer, RendererKind::Switch);
    assert!(form.field("prompt.length").is_none());
    assert!(form.field("").is_none());
}

#[test]
fn test_submission_strips_hidden_fields() {
    let form = video_form();
    let mut state = FormState::new(&form);
    state.set("prompt", json!("a fox in the snow")).unwrap();
    state.set("image_url", json!("https://cdn/frame.png")).unwrap();

    let submission = state.submission(&form).unwrap();
    assert_eq!(submission.generation_type, GenerationType::Video);
    assert_eq!(submission.provider, "kling");
    assert_eq!(submission.model, "kling-v2");
    assert_eq!(
        submission.params,
        json!({
            "prompt": "a fox in the snow",
            "mode": "text",
            "duration": 5,
            "size": "720p",
            "advanced": {"seed": 0, "watermark": false}
        })
    );
}

#[test]
fn test_submission_rejects_invalid_state() {
    let form = video_form();
    let state = FormState::new(&form);

    match state.submission(&form) {
        Err(FormError::Invalid(issues)) => {
            assert_eq!(issues, vec![ValidationIssue::new("prompt", "must not be empty")]);
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[test]
fn test_list_items() {
    let form = FormDefinition::from_json(
        &json!({
            "type": "object",
            "properties": {
                "shots": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"prompt": {"type": "string"}}
                    }
                }
            }
        }),
        GenerationType::Video,
        RenderContext::default(),
    )
    .unwrap();
    let mut state = FormState::new(&form);

    assert_eq!(state.add_item(&form, "shots").unwrap(), 0);
    assert_eq!(state.add_item(&form, "shots").unwrap(), 1);
    state.set("shots.1.prompt", json!("close-up")).unwrap();

    let rows = form.render(&state);
    assert_eq!(paths(&rows), vec!["shots", "shots.0.prompt", "shots.1.prompt"]);
    assert_eq!(form.field("shots.1.prompt").unwrap().renderer, RendererKind::TextArea);

    let removed = state.remove_item("shots", 0).unwrap();
    assert_eq!(removed, json!({"prompt": ""}));
    assert_eq!(state.get("shots.0.prompt"), Some(&json!("close-up")));
    assert!(state.remove_item("shots", 5).is_err());
}

#[test]
fn test_set_rejects_paths_through_scalars() {
    let form = video_form();
    let mut state = FormState::new(&form);
    assert!(matches!(
        state.set("prompt.inner", json!(1)),
        Err(FormError::InvalidPath(_))
    ));
    assert!(state.set("extra.nested", json!(true)).is_ok());
    assert_eq!(state.get("extra.nested"), Some(&json!(true)));
}

#[test]
fn test_root_must_be_object() {
    let err = FormDefinition::from_json(
        &json!({"type": "string"}),
        GenerationType::Image,
        RenderContext::default(),
    )
    .unwrap_err();
    assert!(matches!(err, FormError::InvalidSchema { ref path, .. } if path == "#"));
}

#[test]
fn test_voice_selector_carries_model_scope() {
    let form = FormDefinition::from_json(
        &json!({"type": "object", "properties": {"voice_id": {"type": "string"}}}),
        GenerationType::Audio,
        RenderContext {
            provider: "minimax".to_string(),
            model: "speech-02-hd".to_string(),
        },
    )
    .unwrap();
    assert_eq!(
        form.fields()[0].renderer,
        RendererKind::VoiceSelector {
            provider: "minimax".to_string(),
            model: "speech-02-hd".to_string()
        }
    );
}
