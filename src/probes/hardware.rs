//! Hardware profile probes.
//!
//! The media probe is the one multi-verdict probe of the default registry:
//! a single permission prompt and device enumeration feeds both the camera
//! row and the microphone row.

use std::rc::Rc;

use integrity_core::{CheckConfig, ProbeOutcome, ProbeResult, SubRow, Verdict};
use js_sys::{Array, Object, Reflect};
use wasm_bindgen::prelude::*;

use super::{js, matches_keyword};

pub const MEDIA_KEY: &str = "media-devices";
pub const CAMERAS_KEY: &str = "connected-cameras";
pub const MICS_KEY: &str = "connected-mics";

/// Rows reported by the media probe.
pub fn media_rows() -> Vec<SubRow> {
    vec![
        SubRow::new(CAMERAS_KEY, "Connected Cameras"),
        SubRow::new(MICS_KEY, "Connected Microphones"),
    ]
}

/// One screen as reported by the Window Management API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayReading {
    /// `getScreenDetails()` succeeded.
    Detailed(Vec<ScreenRect>),
    /// `getScreenDetails()` exists but was refused.
    PermissionDenied,
    /// Only `screen.isExtended` is available.
    Legacy { extended: bool, width: i32, height: i32 },
}

pub fn assess_display(reading: &DisplayReading) -> Verdict {
    match reading {
        DisplayReading::Detailed(screens) => {
            let listing = screens
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    format!(
                        "[Screen {}]: {}x{} @ ({}, {})",
                        i + 1,
                        s.width,
                        s.height,
                        s.left,
                        s.top
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            Verdict::from_flag(
                screens.len() > 1,
                format!(
                    "Detected {} screen(s) via Window Management API.\n{}",
                    screens.len(),
                    listing
                ),
            )
        }
        DisplayReading::PermissionDenied => {
            Verdict::flagged("Permission for Window Management API denied. Using fallback.")
        }
        DisplayReading::Legacy {
            extended,
            width,
            height,
        } => Verdict::from_flag(
            *extended,
            format!(
                "Detected {} screen(s) via legacy properties.\nResolution: {}x{}",
                if *extended { "2+" } else { "1" },
                width,
                height
            ),
        ),
    }
}

pub async fn display_setup() -> ProbeResult {
    let window = js::window()?;
    let window_value: JsValue = window.clone().into();

    let reading = if js::has(&window_value, "getScreenDetails") {
        match js::call_async(&window_value, "getScreenDetails", &Array::new()).await {
            Ok(details) => {
                let screens = js::get(&details, "screens").map_err(js::probe_error)?;
                let screens = Array::from(&screens)
                    .iter()
                    .map(|s| ScreenRect {
                        width: js::get_f64(&s, "width").unwrap_or(0.0),
                        height: js::get_f64(&s, "height").unwrap_or(0.0),
                        left: js::get_f64(&s, "left").unwrap_or(0.0),
                        top: js::get_f64(&s, "top").unwrap_or(0.0),
                    })
                    .collect();
                DisplayReading::Detailed(screens)
            }
            Err(err) => {
                log::debug!("getScreenDetails refused: {:?}", err);
                DisplayReading::PermissionDenied
            }
        }
    } else {
        let screen = window.screen().map_err(js::probe_error)?;
        let screen_value: JsValue = screen.clone().into();
        DisplayReading::Legacy {
            extended: js::get_truthy(&screen_value, "isExtended"),
            width: screen.width().map_err(js::probe_error)?,
            height: screen.height().map_err(js::probe_error)?,
        }
    };

    Ok(ProbeOutcome::single(assess_display(&reading)))
}

/// A `MediaDeviceInfo` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDevice {
    pub kind: String,
    pub label: String,
}

impl MediaDevice {
    pub fn new(kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            label: label.into(),
        }
    }
}

/// Verdict for one device class.
pub fn assess_devices<'a>(
    labels: impl IntoIterator<Item = &'a str>,
    keywords: &[String],
    none_found: &str,
) -> Verdict {
    let labels: Vec<&str> = labels.into_iter().collect();
    if labels.is_empty() {
        return Verdict::pass(none_found);
    }
    let listing = labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("[{}] {}", i + 1, label))
        .collect::<Vec<_>>()
        .join("\n");
    let suspicious = labels.iter().any(|label| matches_keyword(label, keywords));
    Verdict::from_flag(suspicious, listing)
}

pub fn assess_media(devices: &[MediaDevice], keywords: &[String]) -> ProbeOutcome {
    let of_kind = |kind: &'static str| {
        devices
            .iter()
            .filter(move |d| d.kind == kind)
            .map(|d| d.label.as_str())
    };
    ProbeOutcome::multi([
        (
            CAMERAS_KEY,
            assess_devices(of_kind("videoinput"), keywords, "No cameras found."),
        ),
        (
            MICS_KEY,
            assess_devices(of_kind("audioinput"), keywords, "No microphones found."),
        ),
    ])
}

/// Both rows flagged with the error name.
pub fn media_failure(error_name: &str) -> ProbeOutcome {
    let detail = format!("Error: {}. Permission may have been denied.", error_name);
    ProbeOutcome::multi([
        (CAMERAS_KEY, Verdict::flagged(detail.clone())),
        (MICS_KEY, Verdict::flagged(detail)),
    ])
}

pub async fn media_devices(config: Rc<CheckConfig>) -> ProbeResult {
    let navigator = js::navigator()?;
    let media = js::get(&navigator, "mediaDevices").map_err(js::probe_error)?;

    let constraints = Object::new();
    Reflect::set(&constraints, &JsValue::from_str("audio"), &JsValue::TRUE)
        .map_err(js::probe_error)?;
    Reflect::set(&constraints, &JsValue::from_str("video"), &JsValue::TRUE)
        .map_err(js::probe_error)?;

    let stream = match js::call_async(&media, "getUserMedia", &Array::of1(&constraints)).await {
        Ok(stream) => stream,
        Err(err) => return Ok(media_failure(&js::error_name(&err))),
    };

    let listed = js::call_async(&media, "enumerateDevices", &Array::new()).await;
    stop_tracks(&stream);

    let devices: Vec<MediaDevice> = match listed {
        Ok(list) => Array::from(&list)
            .iter()
            .map(|d| {
                MediaDevice::new(
                    js::get_string(&d, "kind").unwrap_or_default(),
                    js::get_string(&d, "label").unwrap_or_default(),
                )
            })
            .collect(),
        Err(err) => return Ok(media_failure(&js::error_name(&err))),
    };

    Ok(assess_media(&devices, &config.suspicious_device_keywords))
}

/// Release camera and microphone so the browser indicator turns off.
fn stop_tracks(stream: &JsValue) {
    let tracks = match js::call_method(stream, "getTracks", &Array::new()) {
        Ok(tracks) => Array::from(&tracks),
        Err(err) => {
            log::warn!("Could not list media tracks: {:?}", err);
            return;
        }
    };
    for track in tracks.iter() {
        if let Err(err) = js::call_method(&track, "stop", &Array::new()) {
            log::warn!("Could not stop media track: {:?}", err);
        }
    }
}

pub fn assess_screen(width: i32, height: i32, color_depth: i32, config: &CheckConfig) -> Verdict {
    let mut detail = format!(
        "Resolution: {}x{}, Color Depth: {}-bit",
        width, height, color_depth
    );
    let uncommon = width < config.min_screen_width as i32
        || height < config.min_screen_height as i32
        || color_depth < config.min_color_depth as i32;
    if uncommon {
        detail.push_str(" (Uncommon screen properties may indicate a VM).");
    }
    Verdict::from_flag(uncommon, detail)
}

pub async fn screen_properties(config: Rc<CheckConfig>) -> ProbeResult {
    let screen = js::window()?.screen().map_err(js::probe_error)?;
    let width = screen.width().map_err(js::probe_error)?;
    let height = screen.height().map_err(js::probe_error)?;
    let depth = screen.color_depth().map_err(js::probe_error)?;
    Ok(ProbeOutcome::single(assess_screen(width, height, depth, &config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use integrity_core::Status;

    fn multi(outcome: ProbeOutcome) -> std::collections::BTreeMap<String, Verdict> {
        match outcome {
            ProbeOutcome::Multi(map) => map,
            other => panic!("Expected multi outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_media_split_by_kind() {
        let keywords = CheckConfig::default().suspicious_device_keywords;
        let devices = vec![
            MediaDevice::new("videoinput", "Integrated Camera"),
            MediaDevice::new("audioinput", "Built-in Microphone"),
            MediaDevice::new("videoinput", "OBS Virtual Camera"),
            MediaDevice::new("audiooutput", "Speakers"),
        ];

        let rows = multi(assess_media(&devices, &keywords));

        assert_eq!(rows.len(), 2);
        let cameras = &rows[CAMERAS_KEY];
        assert_eq!(cameras.status(), Status::Flagged);
        assert_eq!(cameras.detail(), "[1] Integrated Camera\n[2] OBS Virtual Camera");
        assert_eq!(rows[MICS_KEY], Verdict::pass("[1] Built-in Microphone"));
    }

    #[test]
    fn test_media_without_devices() {
        let keywords = CheckConfig::default().suspicious_device_keywords;
        let rows = multi(assess_media(&[], &keywords));
        assert_eq!(rows[CAMERAS_KEY], Verdict::pass("No cameras found."));
        assert_eq!(rows[MICS_KEY], Verdict::pass("No microphones found."));
    }

    #[test]
    fn test_media_failure_flags_both_rows() {
        let rows = multi(media_failure("NotAllowedError"));
        for key in [CAMERAS_KEY, MICS_KEY] {
            assert_eq!(
                rows[key],
                Verdict::flagged("Error: NotAllowedError. Permission may have been denied.")
            );
        }
    }

    #[test]
    fn test_media_rows_match_outcome_keys() {
        let keys: Vec<String> = media_rows().into_iter().map(|r| r.key).collect();
        let outcome_keys: Vec<String> = multi(media_failure("x")).into_keys().collect();
        assert_eq!(keys, outcome_keys);
    }

    #[test]
    fn test_display_readings() {
        let one = DisplayReading::Detailed(vec![ScreenRect {
            width: 1920.0,
            height: 1080.0,
            left: 0.0,
            top: 0.0,
        }]);
        assert_eq!(
            assess_display(&one),
            Verdict::pass(
                "Detected 1 screen(s) via Window Management API.\n[Screen 1]: 1920x1080 @ (0, 0)"
            )
        );

        let two = DisplayReading::Detailed(vec![
            ScreenRect {
                width: 1920.0,
                height: 1080.0,
                left: 0.0,
                top: 0.0,
            },
            ScreenRect {
                width: 1280.0,
                height: 1024.0,
                left: 1920.0,
                top: 0.0,
            },
        ]);
        assert_eq!(assess_display(&two).status(), Status::Flagged);
        assert_eq!(assess_display(&DisplayReading::PermissionDenied).status(), Status::Flagged);

        let legacy = DisplayReading::Legacy {
            extended: true,
            width: 2560,
            height: 1440,
        };
        assert_eq!(
            assess_display(&legacy),
            Verdict::flagged("Detected 2+ screen(s) via legacy properties.\nResolution: 2560x1440")
        );
    }

    #[test]
    fn test_screen_properties() {
        let config = CheckConfig::default();
        assert_eq!(
            assess_screen(1920, 1080, 24, &config),
            Verdict::pass("Resolution: 1920x1080, Color Depth: 24-bit")
        );
        assert_eq!(assess_screen(1024, 768, 16, &config).status(), Status::Flagged);
        assert_eq!(assess_screen(640, 480, 24, &config).status(), Status::Flagged);
    }
}
