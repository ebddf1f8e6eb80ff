//! Browser probes
//!
//! The leaf bodies of the default checks. Each probe reads one browser
//! signal and turns it into a verdict through a pure `assess_*` function,
//! so the heuristics are testable without a browser.
//!
//! ## Default registry
//!
//! | Group          | Rows |
//! |----------------|------|
//! | virtualization | webgl-renderer, automation-flags, hardware-concurrency, cpu-ram, battery-status, device-sensors |
//! | hardware       | display-setup, connected-cameras + connected-mics (one probe), screen-properties |
//! | browser        | dev-tools, window-focus, clipboard-activity |
//! | network        | vpn-proxy, network-info |
//! | fingerprint    | canvas-fingerprint, audio-fingerprint |

pub mod browser;
pub mod fingerprint;
pub mod hardware;
pub mod js;
pub mod network;
pub mod virtualization;

use std::rc::Rc;
use std::sync::Arc;

use integrity_core::{
    probe_fn, CheckConfig, ClipboardProbe, ProbeRegistry, RegistryError, SignalCounters,
    WindowFocusProbe,
};

pub const GROUP_VIRTUALIZATION: &str = "virtualization";
pub const GROUP_HARDWARE: &str = "hardware";
pub const GROUP_BROWSER: &str = "browser";
pub const GROUP_NETWORK: &str = "network";
pub const GROUP_FINGERPRINT: &str = "fingerprint";

/// All groups, in display order.
pub const GROUPS: [&str; 5] = [
    GROUP_VIRTUALIZATION,
    GROUP_HARDWARE,
    GROUP_BROWSER,
    GROUP_NETWORK,
    GROUP_FINGERPRINT,
];

/// Case-insensitive substring match against any keyword.
pub fn matches_keyword(text: &str, keywords: &[String]) -> bool {
    let text = text.to_lowercase();
    keywords
        .iter()
        .any(|keyword| text.contains(&keyword.to_lowercase()))
}

/// Build the default registry.
pub fn default_registry(
    config: &Rc<CheckConfig>,
    counters: &Arc<SignalCounters>,
) -> Result<ProbeRegistry, RegistryError> {
    let c = config.clone();
    let webgl = probe_fn(move || virtualization::webgl_renderer(c.clone()));
    let c = config.clone();
    let cores = probe_fn(move || virtualization::hardware_concurrency(c.clone()));
    let c = config.clone();
    let ram = probe_fn(move || virtualization::cpu_ram(c.clone()));
    let c = config.clone();
    let media = probe_fn(move || hardware::media_devices(c.clone()));
    let c = config.clone();
    let screen = probe_fn(move || hardware::screen_properties(c.clone()));
    let c = config.clone();
    let vpn = probe_fn(move || network::vpn_proxy(c.clone()));

    ProbeRegistry::builder()
        // Virtualization & emulation
        .single("webgl-renderer", "WebGL Renderer", GROUP_VIRTUALIZATION, webgl)
        .single(
            "automation-flags",
            "Automation Flags",
            GROUP_VIRTUALIZATION,
            probe_fn(virtualization::automation_flags),
        )
        .single("hardware-concurrency", "Hardware Concurrency", GROUP_VIRTUALIZATION, cores)
        .single("cpu-ram", "Estimated System RAM", GROUP_VIRTUALIZATION, ram)
        .single(
            "battery-status",
            "Battery Status",
            GROUP_VIRTUALIZATION,
            probe_fn(virtualization::battery_status),
        )
        .single(
            "device-sensors",
            "Device Sensors (Motion/Orientation)",
            GROUP_VIRTUALIZATION,
            probe_fn(virtualization::device_sensors),
        )
        // Hardware profile
        .single(
            "display-setup",
            "Display Setup",
            GROUP_HARDWARE,
            probe_fn(hardware::display_setup),
        )
        .multi(
            hardware::MEDIA_KEY,
            "Media Devices",
            GROUP_HARDWARE,
            hardware::media_rows(),
            media,
        )
        .single("screen-properties", "Screen Properties", GROUP_HARDWARE, screen)
        // Browser integrity
        .single(
            "dev-tools",
            "Developer Tools",
            GROUP_BROWSER,
            browser::DevToolsProbe::new(config),
        )
        .single(
            "window-focus",
            "Window Focus",
            GROUP_BROWSER,
            WindowFocusProbe::new(counters.clone(), config.focus_loss_threshold),
        )
        .single(
            "clipboard-activity",
            "Clipboard Activity",
            GROUP_BROWSER,
            ClipboardProbe::new(counters.clone(), config.clipboard_threshold),
        )
        // Network & anonymity
        .single("vpn-proxy", "VPN / Proxy Detection", GROUP_NETWORK, vpn)
        .single(
            "network-info",
            "Network Information",
            GROUP_NETWORK,
            probe_fn(network::network_info),
        )
        // Fingerprinting
        .single(
            "canvas-fingerprint",
            "Canvas Fingerprint",
            GROUP_FINGERPRINT,
            probe_fn(fingerprint::canvas_fingerprint),
        )
        .single(
            "audio-fingerprint",
            "Audio Fingerprint",
            GROUP_FINGERPRINT,
            probe_fn(fingerprint::audio_fingerprint),
        )
        .build()
}
