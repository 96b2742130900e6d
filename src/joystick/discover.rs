use crate::joystick::decode::looks_like_joystick;
use crate::joystick::JoystickSource;
use anyhow::Result;
use evdev::Device;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Scans /dev/input/event* for joystick-like devices, ordered by node
/// number so indices stay stable between runs.
pub fn discover_joysticks() -> Result<Vec<JoystickSource>> {
    let mut sources = Vec::new();
    let input_dir = Path::new("/dev/input");

    let entries = match fs::read_dir(input_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("failed to read /dev/input: {err}");
            return Ok(sources);
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with("event"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort_by_key(|path| event_node_number(path));

    for path in paths {
        if let Some(source) = probe_device(&path) {
            sources.push(source);
        }
    }

    Ok(sources)
}

/// Explicit device list from JOYDECK_DEVICES (comma-separated event-node
/// paths), bypassing discovery. Useful when permissions hide /dev/input.
pub fn sources_from_env() -> Option<Vec<JoystickSource>> {
    let raw = match std::env::var("JOYDECK_DEVICES") {
        Ok(value) if !value.trim().is_empty() => value,
        _ => return None,
    };

    let mut sources = Vec::new();
    for entry in raw.split(',') {
        let path = PathBuf::from(entry.trim());
        match probe_device(&path) {
            Some(source) => sources.push(source),
            None => warn!(
                "skipping {} (not joystick-like or unreadable)",
                path.display()
            ),
        }
    }

    Some(sources)
}

fn probe_device(path: &Path) -> Option<JoystickSource> {
    let device = Device::open(path).ok()?;

    if !looks_like_joystick(&device) {
        debug!("skip {} (not joystick-like)", path.display());
        return None;
    }

    let name = device
        .name()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    debug!("candidate joystick: {} ({})", name, path.display());

    Some(JoystickSource {
        path: path.to_path_buf(),
        name,
    })
}

fn event_node_number(path: &Path) -> u32 {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix("event"))
        .and_then(|suffix| suffix.parse().ok())
        .unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_nodes_sort_numerically() {
        let mut paths = vec![
            PathBuf::from("/dev/input/event10"),
            PathBuf::from("/dev/input/event2"),
            PathBuf::from("/dev/input/event1"),
        ];
        paths.sort_by_key(|path| event_node_number(path));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/dev/input/event1"),
                PathBuf::from("/dev/input/event2"),
                PathBuf::from("/dev/input/event10"),
            ]
        );
    }

    #[test]
    fn malformed_node_names_sort_last() {
        assert_eq!(event_node_number(Path::new("/dev/input/mice")), u32::MAX);
        assert_eq!(event_node_number(Path::new("/dev/input/event7")), 7);
    }
}
