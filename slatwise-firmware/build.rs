//! Build script for slatwise-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates actuator.toml at compile time
//! - Generates the board constants the firmware includes

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    let config = validate_config();
    generate_constants(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate actuator.toml and return the parsed document
fn validate_config() -> toml::Value {
    println!("cargo:rerun-if-changed=actuator.toml");

    let config_path = Path::new("actuator.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: actuator.toml not found!                                 ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires an actuator.toml board configuration.     ║\n\
            ║  Please create one in the slatwise-firmware directory.           ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read actuator.toml                             ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in actuator.toml                     ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_servo(&config, &mut errors);
    validate_motion(&config, &mut errors);
    validate_link(&config, &mut errors);
    report_errors(&errors);

    println!("cargo:warning=actuator.toml validated successfully");
    config
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn report_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: Invalid actuator configuration                           ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Integer field within `min..=max`
fn int_field(
    config: &toml::Value,
    section: &str,
    key: &str,
    min: i64,
    max: i64,
    errors: &mut Vec<String>,
) -> Option<i64> {
    match config.get(section).and_then(|s| s.get(key)) {
        Some(toml::Value::Integer(v)) if (min..=max).contains(v) => Some(*v),
        Some(toml::Value::Integer(_)) => {
            errors.push(format!("[{}] {} must be {}-{}", section, key, min, max));
            None
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            None
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            None
        }
    }
}

fn bool_field(
    config: &toml::Value,
    section: &str,
    key: &str,
    errors: &mut Vec<String>,
) -> Option<bool> {
    match config.get(section).and_then(|s| s.get(key)) {
        Some(toml::Value::Boolean(v)) => Some(*v),
        Some(_) => {
            errors.push(format!("[{}] {} must be true or false", section, key));
            None
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            None
        }
    }
}

fn validate_servo(config: &toml::Value, errors: &mut Vec<String>) {
    let period = int_field(config, "servo", "period_us", 2_500, 50_000, errors);
    let pulses = [
        int_field(config, "servo", "stop_us", 500, 2_500, errors),
        int_field(config, "servo", "forward_us", 500, 2_500, errors),
        int_field(config, "servo", "reverse_us", 500, 2_500, errors),
    ];
    bool_field(config, "servo", "power_active_high", errors);

    if let Some(period) = period {
        if 1_000_000 % period != 0 {
            errors.push("[servo] period_us must divide one second evenly".into());
        }
    }
    if let [Some(stop), Some(forward), Some(reverse)] = pulses {
        if !(reverse < stop && stop < forward) {
            errors.push("[servo] expected reverse_us < stop_us < forward_us".into());
        }
    }
}

fn validate_motion(config: &toml::Value, errors: &mut Vec<String>) {
    int_field(config, "motion", "deadband_ticks", 0, 100, errors);
    int_field(config, "motion", "watchdog_window_ms", 50, 10_000, errors);
    int_field(config, "motion", "remote_settle_ms", 0, 10_000, errors);
    int_field(config, "motion", "calibration_settle_ms", 0, 10_000, errors);
    int_field(config, "motion", "target_id", 1, 255, errors);
    bool_field(config, "sensors", "pull_up", errors);
}

fn validate_link(config: &toml::Value, errors: &mut Vec<String>) {
    int_field(config, "link", "baud_rate", 9_600, 1_000_000, errors);
}

/// Write the validated values as Rust constants into OUT_DIR
fn generate_constants(config: &toml::Value) {
    let int = |section: &str, key: &str| {
        config
            .get(section)
            .and_then(|s| s.get(key))
            .and_then(toml::Value::as_integer)
            .unwrap()
    };
    let flag = |section: &str, key: &str| {
        config
            .get(section)
            .and_then(|s| s.get(key))
            .and_then(toml::Value::as_bool)
            .unwrap()
    };

    let generated = format!(
        "// Generated from actuator.toml by build.rs\n\
        pub const SERVO_PERIOD_US: u16 = {};\n\
        pub const SERVO_STOP_US: u16 = {};\n\
        pub const SERVO_FORWARD_US: u16 = {};\n\
        pub const SERVO_REVERSE_US: u16 = {};\n\
        pub const SERVO_POWER_ACTIVE_HIGH: bool = {};\n\
        pub const DEADBAND_TICKS: i32 = {};\n\
        pub const WATCHDOG_WINDOW_MS: u64 = {};\n\
        pub const REMOTE_SETTLE_MS: u32 = {};\n\
        pub const CALIBRATION_SETTLE_MS: u32 = {};\n\
        pub const TARGET_ID: u8 = {};\n\
        pub const SENSOR_PULL_UP: bool = {};\n\
        pub const LINK_BAUD_RATE: u32 = {};\n",
        int("servo", "period_us"),
        int("servo", "stop_us"),
        int("servo", "forward_us"),
        int("servo", "reverse_us"),
        flag("servo", "power_active_high"),
        int("motion", "deadband_ticks"),
        int("motion", "watchdog_window_ms"),
        int("motion", "remote_settle_ms"),
        int("motion", "calibration_settle_ms"),
        int("motion", "target_id"),
        flag("sensors", "pull_up"),
        int("link", "baud_rate"),
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("actuator_config.rs"), generated).unwrap();
}
