// Runtime configuration
//
// Everything has a sane default. Environment variables override the
// defaults when running the real binary, tests build a Config directly.
use crate::input::Mods;
use utils::{bail, Context, Result};

/// The libinput seat to read from
pub const ENV_SEAT: &str = "WAYVK_SEAT";
/// Which modifier makes up the switch and quit chords
pub const ENV_MODKEY: &str = "WAYVK_MODKEY";
/// How long to wait for a swapchain image, in milliseconds
pub const ENV_ACQUIRE_TIMEOUT: &str = "WAYVK_ACQUIRE_TIMEOUT_MS";
/// "recreate" or "ignore"
pub const ENV_DEGRADED: &str = "WAYVK_DEGRADED";
/// "1" to turn on the Vulkan validation layers
pub const ENV_VALIDATION: &str = "WAYVK_VALIDATION";

/// What to do when the swapchain reports it is suboptimal
///
/// An out of date swapchain is always recreated, it can't be drawn to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DegradedPolicy {
    /// Rebuild the swapchain in place
    Recreate,
    /// Keep going with the current swapchain
    Ignore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub seat: String,
    /// The modifier for the switch chord. The quit chord is this plus shift.
    pub modkey: Mods,
    pub acquire_timeout_ns: u64,
    pub degraded: DegradedPolicy,
    pub enable_validation: bool,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            cb_config: Config {
                seat: "seat0".to_string(),
                modkey: Mods::CMD,
                // 0 polls, a busy swapchain just skips the tick
                acquire_timeout_ns: 0,
                degraded: DegradedPolicy::Recreate,
                enable_validation: cfg!(debug_assertions),
            },
        }
    }

    /// Defaults overridden by any WAYVK_* environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config, reading overrides through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(seat) = lookup(ENV_SEAT) {
            builder.seat(&seat);
        }
        if let Some(name) = lookup(ENV_MODKEY) {
            builder.modkey(parse_modkey(&name).with_context(|| format!("Bad {}", ENV_MODKEY))?);
        }
        if let Some(ms) = lookup(ENV_ACQUIRE_TIMEOUT) {
            let ms: u64 = ms
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of milliseconds", ENV_ACQUIRE_TIMEOUT))?;
            builder.acquire_timeout_ms(ms);
        }
        if let Some(policy) = lookup(ENV_DEGRADED) {
            builder.degraded(
                parse_degraded(&policy).with_context(|| format!("Bad {}", ENV_DEGRADED))?,
            );
        }
        if let Some(val) = lookup(ENV_VALIDATION) {
            builder.enable_validation(match val.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => bail!("{} must be 0 or 1, got {:?}", ENV_VALIDATION, other),
            });
        }

        Ok(builder.build())
    }
}

fn parse_modkey(name: &str) -> Result<Mods> {
    Ok(match name.trim().to_lowercase().as_str() {
        "cmd" | "meta" | "super" => Mods::CMD,
        "lalt" => Mods::LALT,
        "ralt" => Mods::RALT,
        "lctrl" => Mods::LCTRL,
        "rctrl" => Mods::RCTRL,
        other => bail!("Unknown modifier {:?}", other),
    })
}

fn parse_degraded(name: &str) -> Result<DegradedPolicy> {
    Ok(match name.trim().to_lowercase().as_str() {
        "recreate" => DegradedPolicy::Recreate,
        "ignore" => DegradedPolicy::Ignore,
        other => bail!("Unknown policy {:?}, expected recreate or ignore", other),
    })
}

/// Implements the builder pattern for Config
pub struct ConfigBuilder {
    cb_config: Config,
}

impl ConfigBuilder {
    pub fn seat<'a>(&'a mut self, seat: &str) -> &'a mut Self {
        self.cb_config.seat = seat.to_string();
        self
    }

    pub fn modkey<'a>(&'a mut self, modkey: Mods) -> &'a mut Self {
        self.cb_config.modkey = modkey;
        self
    }

    pub fn acquire_timeout_ms<'a>(&'a mut self, ms: u64) -> &'a mut Self {
        self.cb_config.acquire_timeout_ns = ms.saturating_mul(1_000_000);
        self
    }

    pub fn degraded<'a>(&'a mut self, policy: DegradedPolicy) -> &'a mut Self {
        self.cb_config.degraded = policy;
        self
    }

    pub fn enable_validation<'a>(&'a mut self, enable: bool) -> &'a mut Self {
        self.cb_config.enable_validation = enable;
        self
    }

    pub fn build(self) -> Config {
        self.cb_config
    }
}
