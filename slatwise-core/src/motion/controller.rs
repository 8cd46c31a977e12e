//! Motion controller
//!
//! Single owner of the motion mode, the wand baseline, the stall watchdog
//! and the actuator. Sensor events, motion commands, calibration stages and
//! watchdog expiry all funnel through here, one at a time.
//!
//! The wand and the shaft are linked through a baseline offset: the shaft
//! should sit at `secondary - baseline`. Whenever the controller accepts the
//! current shaft position as correct (boot, arrival, stop) it rebases so
//! that offset becomes zero error.

use embedded_hal_async::delay::DelayNs;
use heapless::Deque;
use slatwise_hal::FlashStorage;
use slatwise_protocol::ActuatorReport;

use crate::calibration::{CalibrationError, CalibrationProfile};
use crate::config::{MotionConfig, MAX_NORMALIZED};
use crate::safety::StallWatchdog;
use crate::sensor::{PositionSensor, SensorEvent, SensorId};
use crate::storage::{Persistence, StorageError};
use crate::traits::{Direction, MotorError, MotorOutput};

use super::actuator::{DriveSource, MotionActuator};
use super::mode::{MotionCommand, MotionMode};

/// Reports buffered between two drains of the outbox
pub const OUTBOX_DEPTH: usize = 8;

/// Errors from controller operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Request addressed another actuator
    InvalidTarget,
    /// Operation not allowed in the current mode
    InvalidMode,
    /// Operation needs a calibrated profile
    NotCalibrated,
    /// A manual mode has priority over the request
    ManualOverride,
    /// Normalized position above 10
    OutOfRange,
    /// Calibration bounds are equal
    NoRange,
    Storage(StorageError),
    Motor(MotorError),
}

impl From<StorageError> for ControlError {
    fn from(e: StorageError) -> Self {
        ControlError::Storage(e)
    }
}

impl From<MotorError> for ControlError {
    fn from(e: MotorError) -> Self {
        ControlError::Motor(e)
    }
}

impl From<CalibrationError> for ControlError {
    fn from(e: CalibrationError) -> Self {
        match e {
            CalibrationError::NoRange => ControlError::NoRange,
            CalibrationError::Storage(e) => ControlError::Storage(e),
        }
    }
}

/// The motion control state machine
pub struct MotionController<'a, M, F, D> {
    config: MotionConfig,
    actuator: MotionActuator<M>,
    profile: CalibrationProfile,
    store: Persistence<F>,
    delay: D,
    watchdog: StallWatchdog,
    primary: &'a PositionSensor,
    secondary: &'a PositionSensor,
    mode: MotionMode,
    wand_armed: bool,
    baseline: i32,
    outbox: Deque<ActuatorReport, OUTBOX_DEPTH>,
}

impl<'a, M, F, D> MotionController<'a, M, F, D>
where
    M: MotorOutput,
    F: FlashStorage,
    D: DelayNs,
{
    pub fn new(
        config: MotionConfig,
        motor: M,
        flash: F,
        delay: D,
        primary: &'a PositionSensor,
        secondary: &'a PositionSensor,
    ) -> Self {
        Self {
            config,
            actuator: MotionActuator::new(motor),
            profile: CalibrationProfile::new(),
            store: Persistence::new(flash),
            delay,
            watchdog: StallWatchdog::new(config.watchdog_window_ms),
            primary,
            secondary,
            mode: MotionMode::Idle,
            wand_armed: false,
            baseline: 0,
            outbox: Deque::new(),
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn mode(&self) -> MotionMode {
        self.mode
    }

    pub fn profile(&self) -> CalibrationProfile {
        self.profile
    }

    pub fn is_wand_armed(&self) -> bool {
        self.wand_armed
    }

    pub fn baseline(&self) -> i32 {
        self.baseline
    }

    pub fn actuator(&self) -> &MotionActuator<M> {
        &self.actuator
    }

    #[cfg(test)]
    pub(crate) fn actuator_mut(&mut self) -> &mut MotionActuator<M> {
        &mut self.actuator
    }

    pub fn watchdog(&self) -> &StallWatchdog {
        &self.watchdog
    }

    pub fn store_mut(&mut self) -> &mut Persistence<F> {
        &mut self.store
    }

    /// When the watchdog next needs a `poll_watchdog` call
    pub fn watchdog_deadline(&self) -> Option<u64> {
        self.watchdog.deadline()
    }

    /// Next report for the link, oldest first
    pub fn pop_report(&mut self) -> Option<ActuatorReport> {
        self.outbox.pop_front()
    }

    fn report(&mut self, report: ActuatorReport) {
        if self.outbox.is_full() {
            self.outbox.pop_front();
        }
        let _ = self.outbox.push_back(report);
    }

    fn port(&self) -> u8 {
        self.config.target_id
    }

    /// Shaft position the wand currently asks for, minus where it is
    fn wand_delta(&self) -> i32 {
        (self.secondary.position() - self.primary.position()) - self.baseline
    }

    fn rebase(&mut self) {
        self.baseline = self.secondary.position() - self.primary.position();
    }

    /// Drive and feed the watchdog when this starts a new run
    fn start_drive(
        &mut self,
        dir: Direction,
        source: DriveSource,
        now_ms: u64,
    ) -> Result<(), ControlError> {
        let starting = self.actuator.direction() != Some(dir);
        self.actuator.drive(dir, source)?;
        if starting {
            self.watchdog.feed(now_ms);
        }
        Ok(())
    }

    fn go_idle(&mut self) -> Result<(), ControlError> {
        self.mode = MotionMode::Idle;
        self.actuator.stop()?;
        Ok(())
    }

    fn report_position(&mut self) {
        if let Some(position) = self.profile.normalized_from_ticks(self.primary.position()) {
            self.report(ActuatorReport::PosHit {
                port: self.port(),
                position,
            });
        }
    }

    /// Boot: load the profile, restore the shaft counter and arm if calibrated
    pub async fn init(&mut self, now_ms: u64) -> Result<(), ControlError> {
        self.profile = CalibrationProfile::load(&mut self.store).await;

        let restored = match self.store.load_position().await {
            Ok(ticks) => {
                self.primary.set_position(ticks);
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ControlError::Storage(e)),
        };
        self.rebase();

        self.report(ActuatorReport::CalibStatus {
            port: self.port(),
            calibrated: self.profile.is_calibrated(),
        });

        if self.profile.is_calibrated() && self.init_main_loop().await.is_err() {
            // Retry the checkpoint on the next idle expiry
            self.watchdog.feed(now_ms);
        }

        restored
    }

    /// Arm the watchdog and wand, and checkpoint the position
    async fn init_main_loop(&mut self) -> Result<(), StorageError> {
        self.watchdog.arm();
        self.wand_armed = true;
        self.rebase();
        self.store.save_position(self.primary.position()).await
    }

    /// React to one detent from either sensor
    pub async fn handle_sensor_event(
        &mut self,
        event: SensorEvent,
        now_ms: u64,
    ) -> Result<(), ControlError> {
        if self.mode.is_calibrating() {
            return self.calibration_follow(now_ms);
        }

        match event.source {
            SensorId::Secondary => {
                // A jog holds the shaft until stopped
                if self.wand_armed && !matches!(self.mode, MotionMode::Jogging(_)) {
                    self.manual_follow(now_ms)?;
                }
            }
            SensorId::Primary => {
                self.watchdog.feed(now_ms);
                match self.mode {
                    MotionMode::ManualFollow => self.manual_follow(now_ms)?,
                    MotionMode::RemoteMove {
                        target_ticks,
                        approach_from_below,
                    } => self.check_arrival(target_ticks, approach_from_below)?,
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// During calibration the shaft mirrors the wand with no bounds
    fn calibration_follow(&mut self, now_ms: u64) -> Result<(), ControlError> {
        match Direction::to_close(self.wand_delta(), self.config.deadband_ticks) {
            Some(dir) => self.start_drive(dir, DriveSource::Manual, now_ms),
            None => {
                self.actuator.stop()?;
                Ok(())
            }
        }
    }

    fn manual_follow(&mut self, now_ms: u64) -> Result<(), ControlError> {
        if self.mode.is_remote() {
            self.go_idle()?;
        }

        let Some((lower, upper)) = self.profile.bounds() else {
            return self.go_idle();
        };

        // Keep the wand's reference inside the travel so turning it back
        // responds immediately instead of first unwinding the overshoot
        let secondary = self.secondary.position();
        let implied = secondary - self.baseline;
        if implied > upper {
            self.baseline = secondary - upper;
        } else if implied < lower {
            self.baseline = secondary - lower;
        }

        let primary = self.primary.position();
        let delta = self.wand_delta();
        let deadband = self.config.deadband_ticks;

        let past_upper = primary >= upper - deadband && delta > deadband;
        let past_lower = primary <= lower + deadband && delta < -deadband;
        if past_upper || past_lower {
            return self.go_idle();
        }

        match Direction::to_close(delta, deadband) {
            Some(dir) => {
                self.start_drive(dir, DriveSource::Manual, now_ms)?;
                self.mode = MotionMode::ManualFollow;
                Ok(())
            }
            None => self.go_idle(),
        }
    }

    fn check_arrival(
        &mut self,
        target_ticks: i32,
        approach_from_below: bool,
    ) -> Result<(), ControlError> {
        let current = self.primary.position();
        // Wand turns during a remote move are not a request
        self.rebase();

        let arrived = if approach_from_below {
            current >= target_ticks
        } else {
            current <= target_ticks
        };
        if arrived {
            let stopped = self.go_idle();
            self.report_position();
            stopped?;
        }
        Ok(())
    }

    /// Apply a motion command addressed to `target`
    pub async fn handle_remote(
        &mut self,
        target: u8,
        command: MotionCommand,
        now_ms: u64,
    ) -> Result<(), ControlError> {
        if target != self.config.target_id {
            return Err(ControlError::InvalidTarget);
        }
        self.handle_command(command, now_ms).await
    }

    pub async fn handle_command(
        &mut self,
        command: MotionCommand,
        now_ms: u64,
    ) -> Result<(), ControlError> {
        match command {
            MotionCommand::Stop => {
                if self.mode.is_calibrating() {
                    return Err(ControlError::InvalidMode);
                }
                self.rebase();
                self.go_idle()
            }
            MotionCommand::MoveDirection(dir) => {
                if self.mode.is_calibrating() {
                    return Err(ControlError::InvalidMode);
                }
                // Without an armed watchdog nothing would ever stop the jog
                if !self.watchdog.is_armed() {
                    return Err(ControlError::NotCalibrated);
                }
                self.start_drive(dir, DriveSource::Manual, now_ms)?;
                self.mode = MotionMode::Jogging(dir);
                Ok(())
            }
            MotionCommand::MoveToNormalizedPosition(position) => {
                self.move_to(position, now_ms).await
            }
        }
    }

    async fn move_to(&mut self, position: u8, now_ms: u64) -> Result<(), ControlError> {
        if position > MAX_NORMALIZED {
            return Err(ControlError::OutOfRange);
        }
        if self.mode.is_calibrating() {
            return Err(ControlError::InvalidMode);
        }
        if self.mode.is_manual() {
            return Err(ControlError::ManualOverride);
        }
        let target_ticks = self
            .profile
            .ticks_from_normalized(position)
            .ok_or(ControlError::NotCalibrated)?;

        self.go_idle()?;
        self.delay.delay_ms(self.config.remote_settle_ms).await;
        let now_ms = now_ms + self.config.remote_settle_ms as u64;

        let current = self.primary.position();
        if (target_ticks - current).abs() <= self.config.deadband_ticks {
            return Ok(());
        }

        let approach_from_below = current < target_ticks;
        let dir = if approach_from_below {
            Direction::CounterClockwise
        } else {
            Direction::Clockwise
        };
        self.start_drive(dir, DriveSource::Remote, now_ms)?;
        self.mode = MotionMode::RemoteMove {
            target_ticks,
            approach_from_below,
        };
        Ok(())
    }

    /// Handle a passed watchdog deadline
    ///
    /// With motion active this is a stall: the shaft is stopped, the wand
    /// disarmed and the profile cleared because the tick bounds no longer
    /// match the mechanism. While idle it is a position checkpoint.
    pub async fn poll_watchdog(&mut self, now_ms: u64) -> Result<(), ControlError> {
        if !self.watchdog.expired(now_ms) {
            return Ok(());
        }

        if self.mode != MotionMode::Idle || self.actuator.is_running() {
            self.handle_stall().await
        } else {
            self.store.save_position(self.primary.position()).await?;
            self.report_position();
            Ok(())
        }
    }

    async fn handle_stall(&mut self) -> Result<(), ControlError> {
        let stopped = self.go_idle();
        self.wand_armed = false;
        self.watchdog.pause();

        let cleared = self.profile.clear(&mut self.store).await;
        if cleared.is_err() {
            self.profile.invalidate();
        }

        self.report(ActuatorReport::RecalibrationRequired { port: self.port() });
        self.report(ActuatorReport::CalibStatus {
            port: self.port(),
            calibrated: false,
        });

        stopped?;
        cleared?;
        Ok(())
    }

    /// Calibration start: only from idle
    pub async fn start_calibration(&mut self) -> Result<(), ControlError> {
        if self.mode != MotionMode::Idle {
            return Err(ControlError::InvalidMode);
        }
        self.actuator.stop()?;
        self.profile.clear(&mut self.store).await?;

        self.wand_armed = false;
        self.watchdog.pause();
        self.rebase();
        self.mode = MotionMode::CalibratingUpward;
        Ok(())
    }

    /// Stage 1 done: record the top bound and start the downward stage
    pub async fn switch_calibration_direction(&mut self) -> Result<(), ControlError> {
        if self.mode != MotionMode::CalibratingUpward {
            return Err(ControlError::InvalidMode);
        }
        self.actuator.stop()?;
        self.delay.delay_ms(self.config.calibration_settle_ms).await;

        self.profile
            .begin_calibration(self.primary.position(), &mut self.store)
            .await?;
        self.rebase();
        self.mode = MotionMode::CalibratingDownward;
        Ok(())
    }

    /// Stage 2 done: record the bottom bound and resume normal operation
    pub async fn complete_calibration(&mut self, now_ms: u64) -> Result<(), ControlError> {
        if self.mode != MotionMode::CalibratingDownward {
            return Err(ControlError::InvalidMode);
        }
        self.actuator.stop()?;
        self.delay.delay_ms(self.config.calibration_settle_ms).await;

        self.profile
            .complete_calibration(self.primary.position(), &mut self.store)
            .await?;
        self.mode = MotionMode::Idle;

        if self.init_main_loop().await.is_err() {
            // The profile is committed; retry the checkpoint on the next idle expiry
            let now_ms = now_ms + self.config.calibration_settle_ms as u64;
            self.watchdog.feed(now_ms);
        }
        Ok(())
    }

    /// Abandon calibration without persisting anything
    pub fn cancel_calibration(&mut self) -> Result<(), ControlError> {
        if !self.mode.is_calibrating() {
            return Err(ControlError::InvalidMode);
        }
        self.go_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryFlash, MockMotor, NoopDelay};
    use embassy_futures::block_on;

    type TestController<'a> = MotionController<'a, MockMotor, MemoryFlash, NoopDelay>;

    fn flash_with(profile: CalibrationProfile, position: Option<i32>) -> MemoryFlash {
        let mut store = Persistence::new(MemoryFlash::new());
        block_on(store.save_profile(&profile)).unwrap();
        if let Some(ticks) = position {
            block_on(store.save_position(ticks)).unwrap();
        }
        store.into_inner()
    }

    fn calibrated_flash() -> MemoryFlash {
        flash_with(CalibrationProfile::from_parts(1000, 0, true), None)
    }

    fn controller<'a>(
        primary: &'a PositionSensor,
        secondary: &'a PositionSensor,
        flash: MemoryFlash,
    ) -> TestController<'a> {
        let mut controller = MotionController::new(
            MotionConfig::default(),
            MockMotor::default(),
            flash,
            NoopDelay::default(),
            primary,
            secondary,
        );
        block_on(controller.init(0)).unwrap();
        while controller.pop_report().is_some() {}
        controller
    }

    fn sensors() -> (PositionSensor, PositionSensor) {
        (
            PositionSensor::new(SensorId::Primary),
            PositionSensor::new(SensorId::Secondary),
        )
    }

    fn move_sensor(
        controller: &mut TestController<'_>,
        sensor: &PositionSensor,
        ticks: i32,
        now_ms: u64,
    ) -> Result<(), ControlError> {
        sensor.set_position(ticks);
        let event = SensorEvent {
            source: sensor.id(),
            new_position: ticks,
        };
        block_on(controller.handle_sensor_event(event, now_ms))
    }

    #[test]
    fn test_init_uncalibrated() {
        let (primary, secondary) = sensors();
        let mut controller = MotionController::new(
            MotionConfig::default(),
            MockMotor::default(),
            MemoryFlash::new(),
            NoopDelay::default(),
            &primary,
            &secondary,
        );
        block_on(controller.init(0)).unwrap();

        assert_eq!(
            controller.pop_report(),
            Some(ActuatorReport::CalibStatus {
                port: 1,
                calibrated: false
            })
        );
        assert!(!controller.is_wand_armed());
        assert!(!controller.watchdog().is_armed());
    }

    #[test]
    fn test_init_restores_position_and_arms() {
        let (primary, secondary) = sensors();
        let flash = flash_with(CalibrationProfile::from_parts(1000, 0, true), Some(420));
        let mut controller = controller(&primary, &secondary, flash);

        assert_eq!(primary.position(), 420);
        assert!(controller.is_wand_armed());
        assert!(controller.watchdog().is_armed());
        assert_eq!(controller.baseline(), -420);
        assert_eq!(block_on(controller.store_mut().load_position()), Ok(420));
    }

    #[test]
    fn test_wand_follow_drives_until_deadband() {
        let (primary, secondary) = sensors();
        secondary.set_position(-5);
        let mut controller = controller(&primary, &secondary, calibrated_flash());
        assert_eq!(controller.baseline(), -5);

        move_sensor(&mut controller, &secondary, 106, 10).unwrap();
        assert_eq!(controller.mode(), MotionMode::ManualFollow);
        assert_eq!(
            controller.actuator().direction(),
            Some(Direction::CounterClockwise)
        );

        // Still short of the wand: keep following
        move_sensor(&mut controller, &primary, 100, 20).unwrap();
        assert_eq!(controller.mode(), MotionMode::ManualFollow);

        // delta = (106 - 110) + 5 = 1, inside the deadband
        move_sensor(&mut controller, &primary, 110, 30).unwrap();
        assert_eq!(controller.mode(), MotionMode::Idle);
        assert!(!controller.actuator().is_running());
    }

    #[test]
    fn test_wand_follow_reverses() {
        let (primary, secondary) = sensors();
        primary.set_position(500);
        secondary.set_position(500);
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        move_sensor(&mut controller, &secondary, 480, 10).unwrap();
        assert_eq!(controller.actuator().direction(), Some(Direction::Clockwise));
    }

    #[test]
    fn test_wand_follow_stops_at_upper_bound() {
        let (primary, secondary) = sensors();
        primary.set_position(999);
        secondary.set_position(999);
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        move_sensor(&mut controller, &secondary, 1010, 10).unwrap();
        assert_eq!(controller.mode(), MotionMode::Idle);
        assert!(!controller.actuator().is_running());
        // Baseline snapped so the wand reference sits at the bound
        assert_eq!(controller.baseline(), 10);
    }

    #[test]
    fn test_wand_follow_stops_at_lower_bound() {
        let (primary, secondary) = sensors();
        primary.set_position(1);
        secondary.set_position(1);
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        move_sensor(&mut controller, &secondary, -10, 10).unwrap();
        assert_eq!(controller.mode(), MotionMode::Idle);
        assert!(!controller.actuator().is_running());
        assert_eq!(controller.baseline(), -10);
    }

    #[test]
    fn test_wand_baseline_snaps_below_lower_bound() {
        let (primary, secondary) = sensors();
        primary.set_position(500);
        secondary.set_position(500);
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        // Wand asks for -200, clamp the reference to the bottom bound
        move_sensor(&mut controller, &secondary, -200, 10).unwrap();
        assert_eq!(controller.baseline(), -200);
        assert_eq!(controller.mode(), MotionMode::ManualFollow);
        assert_eq!(controller.actuator().direction(), Some(Direction::Clockwise));

        move_sensor(&mut controller, &primary, 0, 20).unwrap();
        assert_eq!(controller.mode(), MotionMode::Idle);

        // Turning the wand back responds without unwinding the overshoot
        move_sensor(&mut controller, &secondary, -190, 30).unwrap();
        assert_eq!(controller.mode(), MotionMode::ManualFollow);
        assert_eq!(
            controller.actuator().direction(),
            Some(Direction::CounterClockwise)
        );
    }

    #[test]
    fn test_wand_ignored_when_disarmed() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, MemoryFlash::new());

        move_sensor(&mut controller, &secondary, 50, 10).unwrap();
        assert_eq!(controller.mode(), MotionMode::Idle);
        assert!(!controller.actuator().is_running());
    }

    #[test]
    fn test_remote_move_and_arrival() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        block_on(controller.handle_command(MotionCommand::MoveToNormalizedPosition(5), 0)).unwrap();
        assert_eq!(
            controller.mode(),
            MotionMode::RemoteMove {
                target_ticks: 500,
                approach_from_below: true
            }
        );
        assert_eq!(controller.actuator().source(), Some(DriveSource::Remote));

        move_sensor(&mut controller, &primary, 250, 600).unwrap();
        assert!(controller.mode().is_remote());

        move_sensor(&mut controller, &primary, 500, 700).unwrap();
        assert_eq!(controller.mode(), MotionMode::Idle);
        assert!(!controller.actuator().is_running());
        assert_eq!(controller.baseline(), -500);
        assert_eq!(
            controller.pop_report(),
            Some(ActuatorReport::PosHit {
                port: 1,
                position: 5
            })
        );
    }

    #[test]
    fn test_remote_move_waits_for_settle() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());
        block_on(controller.handle_command(MotionCommand::MoveToNormalizedPosition(3), 0)).unwrap();
        assert!(controller.delay.total_ns >= 500_000_000);
        // Watchdog counts from after the settle
        assert_eq!(controller.watchdog_deadline(), Some(1000));
    }

    #[test]
    fn test_remote_move_within_deadband_is_noop() {
        let (primary, secondary) = sensors();
        primary.set_position(501);
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        block_on(controller.handle_command(MotionCommand::MoveToNormalizedPosition(5), 0)).unwrap();
        assert_eq!(controller.mode(), MotionMode::Idle);
        assert!(!controller.actuator().is_running());
    }

    #[test]
    fn test_remote_move_rejections() {
        let (primary, secondary) = sensors();
        let mut uncalibrated = controller(&primary, &secondary, MemoryFlash::new());
        assert_eq!(
            block_on(uncalibrated.handle_command(MotionCommand::MoveToNormalizedPosition(5), 0)),
            Err(ControlError::NotCalibrated)
        );

        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());
        assert_eq!(
            block_on(controller.handle_command(MotionCommand::MoveToNormalizedPosition(11), 0)),
            Err(ControlError::OutOfRange)
        );
        assert_eq!(
            block_on(controller.handle_remote(2, MotionCommand::MoveToNormalizedPosition(5), 0)),
            Err(ControlError::InvalidTarget)
        );

        block_on(controller.handle_command(MotionCommand::MoveDirection(Direction::Clockwise), 0))
            .unwrap();
        assert_eq!(
            block_on(controller.handle_command(MotionCommand::MoveToNormalizedPosition(5), 0)),
            Err(ControlError::ManualOverride)
        );
        assert_eq!(
            controller.mode(),
            MotionMode::Jogging(Direction::Clockwise)
        );
    }

    #[test]
    fn test_wand_preempts_remote_move() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        block_on(controller.handle_command(MotionCommand::MoveToNormalizedPosition(8), 0)).unwrap();
        assert_eq!(controller.actuator().source(), Some(DriveSource::Remote));

        move_sensor(&mut controller, &secondary, 3, 600).unwrap();
        assert_eq!(controller.mode(), MotionMode::ManualFollow);
        assert_eq!(controller.actuator().source(), Some(DriveSource::Manual));
    }

    #[test]
    fn test_jog_and_stop_rebases() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        block_on(controller.handle_command(
            MotionCommand::MoveDirection(Direction::CounterClockwise),
            0,
        ))
        .unwrap();
        move_sensor(&mut controller, &primary, 40, 100).unwrap();
        // Wand is ignored while jogging
        move_sensor(&mut controller, &secondary, -30, 150).unwrap();
        assert_eq!(
            controller.mode(),
            MotionMode::Jogging(Direction::CounterClockwise)
        );

        block_on(controller.handle_command(MotionCommand::Stop, 200)).unwrap();
        assert_eq!(controller.mode(), MotionMode::Idle);
        assert!(!controller.actuator().is_running());
        assert_eq!(controller.baseline(), -70);
    }

    #[test]
    fn test_stall_during_motion_clears_calibration() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        block_on(controller.handle_command(MotionCommand::MoveToNormalizedPosition(8), 0)).unwrap();
        let deadline = controller.watchdog_deadline().unwrap();
        block_on(controller.poll_watchdog(deadline)).unwrap();

        assert_eq!(controller.mode(), MotionMode::Idle);
        assert!(!controller.actuator().is_running());
        assert!(!controller.profile().is_calibrated());
        assert!(!controller.is_wand_armed());
        assert!(!controller.watchdog().is_armed());
        assert!(!block_on(CalibrationProfile::load(controller.store_mut())).is_calibrated());
        assert_eq!(
            controller.pop_report(),
            Some(ActuatorReport::RecalibrationRequired { port: 1 })
        );
        assert_eq!(
            controller.pop_report(),
            Some(ActuatorReport::CalibStatus {
                port: 1,
                calibrated: false
            })
        );
    }

    #[test]
    fn test_stall_with_failing_flash_still_uncalibrated() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        block_on(controller.handle_command(MotionCommand::MoveDirection(Direction::Clockwise), 0))
            .unwrap();
        controller.store_mut().flash_mut().fail_writes(true);
        let result = block_on(controller.poll_watchdog(10_000));

        assert!(matches!(result, Err(ControlError::Storage(_))));
        assert!(!controller.profile().is_calibrated());
        assert!(!controller.actuator().is_running());
    }

    #[test]
    fn test_jog_rejected_after_stall() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        block_on(controller.handle_command(MotionCommand::MoveDirection(Direction::Clockwise), 0))
            .unwrap();
        block_on(controller.poll_watchdog(10_000)).unwrap();
        assert!(!controller.watchdog().is_armed());

        assert_eq!(
            block_on(
                controller.handle_command(MotionCommand::MoveDirection(Direction::Clockwise), 10_100)
            ),
            Err(ControlError::NotCalibrated)
        );
        assert_eq!(controller.mode(), MotionMode::Idle);
        assert!(!controller.actuator().is_running());
        assert_eq!(controller.watchdog_deadline(), None);
    }

    #[test]
    fn test_jog_rejected_when_uncalibrated() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, MemoryFlash::new());

        assert_eq!(
            block_on(controller.handle_command(
                MotionCommand::MoveDirection(Direction::CounterClockwise),
                0
            )),
            Err(ControlError::NotCalibrated)
        );
        assert!(!controller.actuator().is_running());
    }

    #[test]
    fn test_jog_is_supervised() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        block_on(controller.handle_command(
            MotionCommand::MoveDirection(Direction::CounterClockwise),
            100,
        ))
        .unwrap();
        assert_eq!(controller.watchdog_deadline(), Some(600));
    }

    #[test]
    fn test_primary_detents_keep_watchdog_fed() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        block_on(controller.handle_command(MotionCommand::MoveToNormalizedPosition(8), 0)).unwrap();
        for (i, now) in (900..3000).step_by(300).enumerate() {
            move_sensor(&mut controller, &primary, i as i32 + 1, now).unwrap();
            block_on(controller.poll_watchdog(now + 100)).unwrap();
        }
        assert!(controller.mode().is_remote());
        assert!(controller.profile().is_calibrated());
    }

    #[test]
    fn test_idle_expiry_checkpoints_position() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        block_on(controller.handle_command(MotionCommand::MoveToNormalizedPosition(2), 0)).unwrap();
        move_sensor(&mut controller, &primary, 200, 600).unwrap();
        assert_eq!(controller.mode(), MotionMode::Idle);
        controller.pop_report();

        block_on(controller.poll_watchdog(1100)).unwrap();
        assert!(controller.profile().is_calibrated());
        assert_eq!(block_on(controller.store_mut().load_position()), Ok(200));
        assert_eq!(
            controller.pop_report(),
            Some(ActuatorReport::PosHit {
                port: 1,
                position: 2
            })
        );
    }

    #[test]
    fn test_calibration_follow() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, MemoryFlash::new());

        block_on(controller.start_calibration()).unwrap();
        assert_eq!(controller.mode(), MotionMode::CalibratingUpward);

        move_sensor(&mut controller, &secondary, 5, 10).unwrap();
        assert_eq!(
            controller.actuator().direction(),
            Some(Direction::CounterClockwise)
        );
        move_sensor(&mut controller, &primary, 4, 20).unwrap();
        assert!(!controller.actuator().is_running());

        move_sensor(&mut controller, &secondary, -10, 30).unwrap();
        assert_eq!(controller.actuator().direction(), Some(Direction::Clockwise));
        assert_eq!(controller.mode(), MotionMode::CalibratingUpward);
    }

    #[test]
    fn test_full_calibration() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, MemoryFlash::new());

        block_on(controller.start_calibration()).unwrap();
        primary.set_position(1000);
        block_on(controller.switch_calibration_direction()).unwrap();
        assert_eq!(controller.mode(), MotionMode::CalibratingDownward);
        assert_eq!(controller.profile().top_ticks(), 1000);

        primary.set_position(0);
        block_on(controller.complete_calibration(5000)).unwrap();
        assert_eq!(controller.mode(), MotionMode::Idle);
        assert!(controller.profile().is_calibrated());
        assert!(controller.is_wand_armed());
        assert!(controller.watchdog().is_armed());
        assert_eq!(block_on(controller.store_mut().load_position()), Ok(0));
    }

    #[test]
    fn test_calibration_clears_existing_profile() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, calibrated_flash());

        block_on(controller.start_calibration()).unwrap();
        assert!(!controller.profile().is_calibrated());
        assert!(!controller.is_wand_armed());
        assert!(!controller.watchdog().is_armed());
    }

    #[test]
    fn test_no_range_keeps_stage() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, MemoryFlash::new());

        block_on(controller.start_calibration()).unwrap();
        primary.set_position(1000);
        block_on(controller.switch_calibration_direction()).unwrap();
        assert_eq!(
            block_on(controller.complete_calibration(0)),
            Err(ControlError::NoRange)
        );
        assert_eq!(controller.mode(), MotionMode::CalibratingDownward);
        assert!(!controller.profile().is_calibrated());
    }

    #[test]
    fn test_stage_requires_mode() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, MemoryFlash::new());

        assert_eq!(
            block_on(controller.switch_calibration_direction()),
            Err(ControlError::InvalidMode)
        );
        assert_eq!(
            block_on(controller.complete_calibration(0)),
            Err(ControlError::InvalidMode)
        );
        assert_eq!(controller.cancel_calibration(), Err(ControlError::InvalidMode));
    }

    #[test]
    fn test_cancel_persists_nothing() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, MemoryFlash::new());

        block_on(controller.start_calibration()).unwrap();
        let writes = controller.store_mut().flash_mut().writes;
        move_sensor(&mut controller, &secondary, 20, 10).unwrap();
        controller.cancel_calibration().unwrap();

        assert_eq!(controller.mode(), MotionMode::Idle);
        assert!(!controller.actuator().is_running());
        assert_eq!(controller.store_mut().flash_mut().writes, writes);
    }

    #[test]
    fn test_stop_does_not_leave_calibration() {
        let (primary, secondary) = sensors();
        let mut controller = controller(&primary, &secondary, MemoryFlash::new());

        block_on(controller.start_calibration()).unwrap();
        assert_eq!(
            block_on(controller.handle_command(MotionCommand::Stop, 0)),
            Err(ControlError::InvalidMode)
        );
        assert_eq!(controller.mode(), MotionMode::CalibratingUpward);
    }
}
