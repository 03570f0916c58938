pub trait PlatformProbe {
    /// True when the power profiler would be refused for lack of
    /// privileges, letting the sampler skip the spawn entirely.
    fn needs_elevation() -> bool;
}

#[cfg(target_os = "macos")]
mod macos;
#[cfg(not(target_os = "macos"))]
mod generic;

#[cfg(target_os = "macos")]
use macos as platform_impl;
#[cfg(not(target_os = "macos"))]
use generic as platform_impl;

pub fn needs_elevation() -> bool {
    platform_impl::Platform::needs_elevation()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_does_not_panic() {
        let _ = needs_elevation();
    }
}
