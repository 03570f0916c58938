use super::PlatformProbe;

pub struct Platform;

impl PlatformProbe for Platform {
    fn needs_elevation() -> bool {
        // Elevation is a macOS concern; elsewhere the spawn itself is the
        // only authority on whether the tool can run.
        false
    }
}
