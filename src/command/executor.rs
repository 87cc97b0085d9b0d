// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Applies decoded commands to the channel store.

use std::sync::Arc;
use std::time::Instant;

use crate::color_temp::ColorTempSource;
use crate::command::{Command, CommandType, mix_white};
use crate::error::CommandError;
use crate::state::ChannelStore;
use crate::types::{ChannelSpan, LightCt, RgbColor, TunableWhite, clamp_u8};

/// Turns [`Command`]s into channel store writes.
///
/// The executor validates the channel span before touching anything, so a
/// rejected command never leaves a partial write behind. All writes for one
/// command go through a single grouped store call.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use udp2dmx::color_temp::CtConfig;
/// use udp2dmx::command::{decode, CommandExecutor};
/// use udp2dmx::state::ChannelStore;
///
/// let store = Arc::new(ChannelStore::new());
/// let executor = CommandExecutor::new(Arc::clone(&store), Arc::new(CtConfig::default()));
///
/// executor.execute(&decode("DMXR5#3066012").unwrap()).unwrap();
/// assert_eq!(store.get(5).unwrap(), 12);
/// assert_eq!(store.get(6).unwrap(), 66);
/// assert_eq!(store.get(7).unwrap(), 3);
/// ```
#[derive(Clone)]
pub struct CommandExecutor {
    store: Arc<ChannelStore>,
    color_temp: Arc<dyn ColorTempSource>,
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl CommandExecutor {
    /// Creates an executor writing to `store` and resolving color
    /// temperatures through `color_temp`.
    #[must_use]
    pub fn new(store: Arc<ChannelStore>, color_temp: Arc<dyn ColorTempSource>) -> Self {
        Self { store, color_temp }
    }

    /// Returns the store this executor writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<ChannelStore> {
        &self.store
    }

    /// Executes a command, starting any fade now.
    ///
    /// # Errors
    ///
    /// - `InvalidChannel` if the command's channels do not fit the universe
    /// - `InvalidValue` for an `R` value outside `0..=999_999_999` or an `L`
    ///   value outside its envelope
    /// - `ConfigMissing` if an `L` command hits an empty temperature range
    /// - `LockTimeout` if the store is busy
    pub fn execute(&self, command: &Command) -> Result<(), CommandError> {
        self.execute_at(command, Instant::now())
    }

    /// Executes a command with an explicit fade start instant.
    ///
    /// # Errors
    ///
    /// Same as [`CommandExecutor::execute`].
    pub fn execute_at(&self, command: &Command, now: Instant) -> Result<(), CommandError> {
        let kind = command.command_type();
        let span = ChannelSpan::new(command.channel(), kind.required_slots())?;
        let raw = command.raw_value();
        let fade = command.speed().fade_duration();
        let invalid_value = CommandError::InvalidValue {
            command: kind,
            value: raw,
        };

        let (start, values) = match kind {
            CommandType::Channel => (span.start(), vec![clamp_u8(i64::from(raw))]),
            CommandType::Percentage => (span.start(), vec![percent_to_level(raw)]),
            CommandType::Rgb => {
                if !(0..=RgbColor::MAX_PACKED).contains(&raw) {
                    return Err(invalid_value);
                }
                (span.start(), RgbColor::unpack(raw).channels().to_vec())
            }
            CommandType::TunableWhite => (span.start(), TunableWhite::unpack(raw).channels().to_vec()),
            CommandType::LightCt => {
                let light = LightCt::unpack(raw).ok_or(invalid_value)?;
                let range = self.color_temp.resolve(span.start());
                let mix = mix_white(light, &range)?;
                tracing::debug!(
                    light = %light,
                    warm = mix.warm,
                    warm_channel = range.warm_channel,
                    cool = mix.cool,
                    cool_channel = range.cool_channel,
                    "White mix"
                );
                let (start, pair) = mix.channel_values(&range);
                (start, pair.to_vec())
            }
        };

        self.store.set_with_optional_fade_at(start, &values, fade, now)?;
        tracing::info!(
            command = %command,
            start,
            values = ?values,
            fade_ms = command.speed().duration_ms(),
            "Command executed"
        );
        Ok(())
    }
}

/// Scales a percentage to a channel level, rounding half up.
fn percent_to_level(percent: i32) -> u8 {
    let percent = i64::from(percent).max(0);
    clamp_u8((percent * 255 + 50) / 100)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::color_temp::CtConfig;
    use crate::types::{SpeedCode, UNIVERSE_SIZE};

    fn executor() -> (CommandExecutor, Arc<ChannelStore>) {
        let store = Arc::new(ChannelStore::new());
        let config = CtConfig::default().with_channel(20, 3000).with_channel(21, 6500);
        (CommandExecutor::new(Arc::clone(&store), Arc::new(config)), store)
    }

    fn run(executor: &CommandExecutor, kind: CommandType, channel: i32, value: i32) -> Result<(), CommandError> {
        executor.execute(&Command::new(kind, channel, value))
    }

    // ========== Channel and percentage ==========

    #[test]
    fn channel_value_is_clamped() {
        let (exec, store) = executor();
        run(&exec, CommandType::Channel, 1, 300).unwrap();
        run(&exec, CommandType::Channel, 2, -4).unwrap();
        run(&exec, CommandType::Channel, 512, 77).unwrap();
        assert_eq!(store.get(1).unwrap(), 255);
        assert_eq!(store.get(2).unwrap(), 0);
        assert_eq!(store.get(512).unwrap(), 77);
    }

    #[test]
    fn percentage_rounds_and_clamps() {
        assert_eq!(percent_to_level(0), 0);
        assert_eq!(percent_to_level(1), 3);
        assert_eq!(percent_to_level(50), 128);
        assert_eq!(percent_to_level(100), 255);
        assert_eq!(percent_to_level(150), 255);
        assert_eq!(percent_to_level(-20), 0);

        let (exec, store) = executor();
        run(&exec, CommandType::Percentage, 10, 50).unwrap();
        assert_eq!(store.get(10).unwrap(), 128);
    }

    // ========== Channel range ==========

    #[test]
    fn out_of_range_leaves_store_untouched() {
        let (exec, store) = executor();
        let cases = [
            (CommandType::Channel, 0),
            (CommandType::Channel, 513),
            (CommandType::Percentage, -1),
            (CommandType::TunableWhite, 512),
            (CommandType::LightCt, 512),
            (CommandType::Rgb, 511),
        ];
        for (kind, channel) in cases {
            let err = run(&exec, kind, channel, 200_504_000).unwrap_err();
            assert_eq!(
                err,
                CommandError::InvalidChannel {
                    channel,
                    width: kind.required_slots(),
                }
            );
        }
        assert_eq!(store.snapshot().unwrap(), [0; UNIVERSE_SIZE]);
    }

    #[test]
    fn last_slots_are_reachable() {
        let (exec, store) = executor();
        run(&exec, CommandType::Rgb, 510, 3_002_001).unwrap();
        assert_eq!(store.get(510).unwrap(), 1);
        assert_eq!(store.get(512).unwrap(), 3);
    }

    // ========== Packed values ==========

    #[test]
    fn rgb_without_speed_is_immediate() {
        let (exec, store) = executor();
        run(&exec, CommandType::Rgb, 5, 3_066_012).unwrap();
        assert_eq!(store.get(5).unwrap(), 12);
        assert_eq!(store.get(6).unwrap(), 66);
        assert_eq!(store.get(7).unwrap(), 3);
        assert_eq!(store.active_fades().unwrap(), 0);
    }

    #[test]
    fn rgb_outside_envelope_is_invalid() {
        let (exec, _) = executor();
        for value in [-1, 1_000_000_000] {
            assert_eq!(
                run(&exec, CommandType::Rgb, 1, value),
                Err(CommandError::InvalidValue {
                    command: CommandType::Rgb,
                    value,
                })
            );
        }
    }

    #[test]
    fn tunable_white_order() {
        let (exec, store) = executor();
        run(&exec, CommandType::TunableWhite, 30, 200_050).unwrap();
        assert_eq!(store.get(30).unwrap(), 200);
        assert_eq!(store.get(31).unwrap(), 50);
    }

    // ========== Light CT ==========

    #[test]
    fn light_ct_outside_envelope_is_invalid() {
        let (exec, store) = executor();
        assert_eq!(
            run(&exec, CommandType::LightCt, 20, 199_999_999),
            Err(CommandError::InvalidValue {
                command: CommandType::LightCt,
                value: 199_999_999,
            })
        );
        assert_eq!(store.get(20).unwrap(), 0);
    }

    #[test]
    fn light_ct_pure_warm_and_cool() {
        let (exec, store) = executor();
        run(&exec, CommandType::LightCt, 20, 200_503_050).unwrap();
        assert_eq!((store.get(20).unwrap(), store.get(21).unwrap()), (127, 0));

        run(&exec, CommandType::LightCt, 20, 200_506_500).unwrap();
        assert_eq!((store.get(20).unwrap(), store.get(21).unwrap()), (0, 127));
    }

    #[test]
    fn light_ct_respects_swapped_roles() {
        let store = Arc::new(ChannelStore::new());
        let config = CtConfig::default().with_channel(1, 6500).with_channel(2, 3000);
        let exec = CommandExecutor::new(Arc::clone(&store), Arc::new(config));

        // 100 % at the warm end lights channel 2, the warm emitter
        run(&exec, CommandType::LightCt, 1, 201_003_000).unwrap();
        assert_eq!(store.get(1).unwrap(), 0);
        assert_eq!(store.get(2).unwrap(), 255);
    }

    #[test]
    fn light_ct_degenerate_range() {
        let store = Arc::new(ChannelStore::new());
        let config = CtConfig::default().with_channel(1, 4000).with_channel(2, 4000);
        let exec = CommandExecutor::new(Arc::clone(&store), Arc::new(config));
        assert_eq!(
            run(&exec, CommandType::LightCt, 1, 200_504_000),
            Err(CommandError::ConfigMissing { channel: 1 })
        );
    }

    // ========== Speed ==========

    #[test]
    fn speed_starts_fade() {
        let (exec, store) = executor();
        let t0 = Instant::now();
        let cmd = Command::new(CommandType::Channel, 3, 200).with_speed(SpeedCode::new(1));
        exec.execute_at(&cmd, t0).unwrap();

        assert!(store.is_fading(3).unwrap());
        assert_eq!(store.get(3).unwrap(), 0);

        store.advance_fades(t0 + Duration::from_millis(591)).unwrap();
        assert_eq!(store.get(3).unwrap(), 200);
        assert!(!store.is_fading(3).unwrap());
    }

    #[test]
    fn instant_command_overrides_fade() {
        let (exec, store) = executor();
        let slow = Command::new(CommandType::Channel, 3, 200).with_speed(SpeedCode::new(50));
        exec.execute(&slow).unwrap();
        run(&exec, CommandType::Channel, 3, 40).unwrap();
        assert!(!store.is_fading(3).unwrap());
        assert_eq!(store.get(3).unwrap(), 40);
    }
}
