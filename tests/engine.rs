// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the channel store and the periodic engine.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use udp2dmx::bus::{MemoryOutput, shared};
use udp2dmx::command::{Command, CommandExecutor, CommandType};
use udp2dmx::engine::{FadeScheduler, FrameTransmitter};
use udp2dmx::state::ChannelStore;
use udp2dmx::{CtConfig, SpeedCode, UNIVERSE_SIZE};

fn executor(store: &Arc<ChannelStore>) -> CommandExecutor {
    CommandExecutor::new(Arc::clone(store), Arc::new(CtConfig::default()))
}

// ============================================================================
// Concurrent Writers
// ============================================================================

mod concurrency {
    use super::*;

    #[test]
    fn parallel_writers_all_land() {
        const WRITERS: u16 = 8;
        const PER_WRITER: u16 = 64;

        let store = Arc::new(ChannelStore::new());
        let barrier = Arc::new(Barrier::new(usize::from(WRITERS)));

        let handles: Vec<_> = (0..WRITERS)
            .map(|w| {
                let exec = executor(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..PER_WRITER {
                        let channel = w * PER_WRITER + i + 1;
                        let value = i32::from(channel % 200 + 1);
                        exec.execute(&Command::new(CommandType::Channel, i32::from(channel), value))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let frame = store.snapshot().unwrap();
        for channel in 1..=WRITERS * PER_WRITER {
            let expected = u8::try_from(channel % 200 + 1).unwrap();
            assert_eq!(frame[usize::from(channel - 1)], expected, "channel {channel}");
        }
    }

    #[test]
    fn rgb_writes_are_never_torn() {
        let store = Arc::new(ChannelStore::new());
        let barrier = Arc::new(Barrier::new(3));
        let colors = [255_255_255, 0];

        let writers: Vec<_> = colors
            .into_iter()
            .map(|packed| {
                let exec = executor(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..500 {
                        exec.execute(&Command::new(CommandType::Rgb, 1, packed)).unwrap();
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..500 {
                    let frame = store.snapshot().unwrap();
                    assert!(frame[0] == frame[1] && frame[1] == frame[2], "torn frame {:?}", &frame[..3]);
                }
            })
        };

        for handle in writers {
            handle.join().unwrap();
        }
        reader.join().unwrap();
    }
}

// ============================================================================
// Fade Progression
// ============================================================================

mod fades {
    use super::*;

    fn progression(start: u8, target: u8) -> Vec<u8> {
        let store = ChannelStore::new();
        let t0 = Instant::now();
        store.set_immediate(1, start).unwrap();
        store.start_fade_at(1, target, Duration::from_millis(590), t0).unwrap();

        (0..=60)
            .map(|step| {
                store.advance_fades(t0 + Duration::from_millis(step * 10)).unwrap();
                store.get(1).unwrap()
            })
            .collect()
    }

    #[test]
    fn rising_fade_is_monotonic() {
        let values = progression(10, 250);
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
        assert_eq!(values.first(), Some(&10));
        assert_eq!(values.last(), Some(&250));
    }

    #[test]
    fn falling_fade_is_monotonic() {
        let values = progression(240, 3);
        assert!(values.windows(2).all(|w| w[0] >= w[1]), "{values:?}");
        assert_eq!(values.last(), Some(&3));
    }

    #[test]
    fn halfway_is_midpoint() {
        let store = ChannelStore::new();
        let t0 = Instant::now();
        store.start_fade_at(1, 200, Duration::from_millis(1000), t0).unwrap();
        store.advance_fades(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(store.get(1).unwrap(), 100);
    }

    #[test]
    fn retarget_starts_from_current_value() {
        let store = ChannelStore::new();
        let t0 = Instant::now();
        store.start_fade_at(1, 200, Duration::from_millis(1000), t0).unwrap();
        store.advance_fades(t0 + Duration::from_millis(500)).unwrap();

        let t1 = t0 + Duration::from_millis(500);
        store.start_fade_at(1, 0, Duration::from_millis(100), t1).unwrap();
        store.advance_fades(t1 + Duration::from_millis(50)).unwrap();
        assert_eq!(store.get(1).unwrap(), 50);
    }
}

// ============================================================================
// Engine Tasks
// ============================================================================

mod tasks {
    use super::*;

    #[test]
    fn scheduler_stages_each_changed_step() {
        let store = Arc::new(ChannelStore::new());
        let output = MemoryOutput::new();
        let scheduler = FadeScheduler::new(Arc::clone(&store), shared(output.clone()));

        let t0 = Instant::now();
        let cmd = Command::new(CommandType::Percentage, 4, 100).with_speed(SpeedCode::new(1));
        executor(&store).execute_at(&cmd, t0).unwrap();

        let mut staged = Vec::new();
        for step in 1..=60 {
            let tick = scheduler.tick(t0 + Duration::from_millis(step * 10)).unwrap();
            if tick.changed {
                staged.push(output.staged().unwrap()[3]);
            }
        }

        assert_eq!(staged.last(), Some(&255));
        assert!(staged.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(output.frames_written(), u64::try_from(staged.len()).unwrap());
        assert_eq!(store.active_fades().unwrap(), 0);
    }

    #[test]
    fn transmitter_sends_current_universe() {
        let store = Arc::new(ChannelStore::new());
        let output = MemoryOutput::new();
        let transmitter = FrameTransmitter::new(Arc::clone(&store), shared(output.clone()));

        transmitter.tick().unwrap();
        assert_eq!(output.last_sent(), Some([0; UNIVERSE_SIZE]));

        store.set_immediate(512, 42).unwrap();
        transmitter.tick().unwrap();
        assert_eq!(output.last_sent().map(|f| f[511]), Some(42));
        assert_eq!(output.frames_sent(), 2);
    }

    #[test]
    fn spawned_tasks_drive_a_fade_to_the_bus() {
        let store = Arc::new(ChannelStore::new());
        let output = MemoryOutput::new();
        let bus = shared(output.clone());

        let mut fade_task = FadeScheduler::new(Arc::clone(&store), Arc::clone(&bus))
            .spawn(Duration::from_millis(10))
            .unwrap();
        let mut transmit_task = FrameTransmitter::new(Arc::clone(&store), bus)
            .spawn(Duration::from_millis(30))
            .unwrap();

        store.start_fade(1, 180, Duration::from_millis(200)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline
            && (store.is_fading(1).unwrap() || output.last_sent().is_none_or(|f| f[0] != 180))
        {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(output.last_sent().map(|f| f[0]), Some(180));
        assert!(!store.is_fading(1).unwrap());

        fade_task.stop();
        transmit_task.stop();
        assert!(!fade_task.is_running());
        assert!(!transmit_task.is_running());
    }
}
