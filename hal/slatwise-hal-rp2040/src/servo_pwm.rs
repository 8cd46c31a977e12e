//! Servo PWM slice setup
//!
//! Continuous-rotation servos expect a pulse every 20 ms. The RP2040 PWM
//! slice counts at `SYS_CLK / divider` and wraps at `top`, so a 50 Hz frame
//! needs `divider * (top + 1) = SYS_CLK / 50`.

use embassy_rp::pwm::Config;
use fixed::types::U12F4;

/// RP2040 system clock as configured by embassy-rp
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// Integer clock divider and wrap value for a PWM frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SliceTiming {
    pub divider: u8,
    pub top: u16,
}

/// Pick the smallest integer divider that lets `top` fit in 16 bits
///
/// A smaller divider gives finer duty resolution. Returns `None` if the
/// frame cannot be represented.
pub fn slice_timing(sys_clk_hz: u32, frame_hz: u32) -> Option<SliceTiming> {
    if frame_hz == 0 {
        return None;
    }
    let counts = sys_clk_hz / frame_hz;
    for divider in 1u32..=255 {
        if counts % divider != 0 {
            continue;
        }
        let wrap = counts / divider;
        if (1..=u16::MAX as u32 + 1).contains(&wrap) {
            return Some(SliceTiming {
                divider: divider as u8,
                top: (wrap - 1) as u16,
            });
        }
    }
    None
}

/// Build a PWM config for a servo frame with the output initially at zero
pub fn servo_config(timing: SliceTiming) -> Config {
    let mut config = Config::default();
    config.divider = U12F4::from_num(timing.divider);
    config.top = timing.top;
    config.compare_a = 0;
    config.compare_b = 0;
    config
}
