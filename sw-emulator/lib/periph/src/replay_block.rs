/*++

Licensed under the Apache-2.0 license.

File Name:

    replay_block.rs

Abstract:

    File contains the register-mapped anti-replay block: the monotonic
    counter, the nonce generator and the validation front end.

--*/

use crate::anti_replay::{AntiReplayEngine, ReplayStatus, VERDICT_MASK};
use crate::{MonotonicCounter, NonceGenerator};
use secsoc_emu_bus::{ActionHandle, Bus, BusError, Clock, Register, Timer, WriteOnlyRegister};
use secsoc_emu_types::{RvAddr, RvData, RvSize};
use smlang::statemachine;
use tock_registers::interfaces::Readable;
use tock_registers::register_bitfields;
use tock_registers::LocalRegisterCopy;

register_bitfields! [
    u32,

    /// Replay Control Register Fields
    pub ReplayCtrl [
        RESET_CACHE OFFSET(0) NUMBITS(1) [],
        RESET_STATE OFFSET(1) NUMBITS(1) [],
    ],
];

/// Cycles between a `VALIDATE` write and the decision being committed
const VALIDATE_TICKS: u64 = 1;

/// Validation front end
pub struct ReplayValidator {
    /// Counter to check
    check_counter: WriteOnlyRegister,

    /// Nonce to check
    check_nonce: WriteOnlyRegister,

    state_machine: StateMachine<Context>,

    timer: Timer,

    op_complete_action: Option<ActionHandle>,
}

impl ReplayValidator {
    /// Highest accepted counter
    const ADDR_LAST_COUNTER: RvAddr = 0x00;

    /// Counter of the pair to validate
    const ADDR_CHECK_COUNTER: RvAddr = 0x04;

    /// Nonce of the pair to validate
    const ADDR_CHECK_NONCE: RvAddr = 0x08;

    /// Validation trigger
    const ADDR_VALIDATE: RvAddr = 0x0C;

    /// Verdict and ready flag
    const ADDR_STATUS: RvAddr = 0x10;

    /// Number of cached nonces
    const ADDR_CACHE_SIZE: RvAddr = 0x14;

    /// Reset control
    const ADDR_CTRL: RvAddr = 0x18;

    pub fn new(clock: &Clock) -> Self {
        Self {
            check_counter: WriteOnlyRegister::new(0),
            check_nonce: WriteOnlyRegister::new(0),
            state_machine: StateMachine::new(Context::new()),
            timer: Timer::new(clock),
            op_complete_action: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state_machine.state(), States::Ready)
    }

    pub fn engine(&self) -> &AntiReplayEngine {
        &self.state_machine.context().engine
    }

    /// Status register value: verdict bits plus READY
    pub fn status(&self) -> u32 {
        let mut status = LocalRegisterCopy::<u32, ReplayStatus::Register>::new(
            self.engine().verdict().get() & VERDICT_MASK,
        );
        if self.is_ready() {
            status.modify(ReplayStatus::READY::SET);
        }
        status.get()
    }

    fn on_write_validate(&mut self) {
        let submission = Submission {
            counter: self.check_counter.reg.get(),
            nonce: self.check_nonce.reg.get(),
        };
        match self
            .state_machine
            .process_event(Events::Validate(submission))
        {
            Ok(_) => {
                self.op_complete_action = Some(self.timer.schedule_poll_in(VALIDATE_TICKS));
            }
            Err(_) => log::warn!("replay: validate while busy ignored"),
        }
    }

    fn on_write_control(&mut self, val: RvData) {
        let ctrl = LocalRegisterCopy::<u32, ReplayCtrl::Register>::new(val);
        if !ctrl.matches_any(ReplayCtrl::RESET_CACHE::SET + ReplayCtrl::RESET_STATE::SET) {
            return;
        }
        if !self.is_ready() {
            log::debug!("replay: pending validation cancelled");
            self.timer.cancel(&mut self.op_complete_action);
            let _ = self.state_machine.process_event(Events::Abort);
        }
        let engine = &mut self.state_machine.context.engine;
        if ctrl.is_set(ReplayCtrl::RESET_CACHE) {
            engine.reset_cache();
        }
        if ctrl.is_set(ReplayCtrl::RESET_STATE) {
            engine.reset_state();
        }
    }
}

impl Bus for ReplayValidator {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        if size != RvSize::Word {
            Err(BusError::LoadAccessFault)?
        }
        match addr {
            Self::ADDR_LAST_COUNTER => Ok(self.engine().last_counter()),
            Self::ADDR_STATUS => Ok(self.status()),
            Self::ADDR_CACHE_SIZE => Ok(self.engine().cache().len() as RvData),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        match addr {
            Self::ADDR_CHECK_COUNTER => self.check_counter.write(size, val)?,
            Self::ADDR_CHECK_NONCE => self.check_nonce.write(size, val)?,
            Self::ADDR_VALIDATE => self.on_write_validate(),
            Self::ADDR_CTRL => self.on_write_control(val),
            _ => Err(BusError::StoreAccessFault)?,
        }
        Ok(())
    }

    fn poll(&mut self) {
        if self.timer.fired(&mut self.op_complete_action) {
            let _ = self.state_machine.process_event(Events::Complete);
        }
    }
}

/// Counter/nonce pair latched by `VALIDATE`
#[derive(PartialEq)]
pub struct Submission {
    pub counter: u32,
    pub nonce: u32,
}

statemachine! {
    transitions: {
        // CurrentState Event [guard] / action = NextState
        *Ready + Validate(Submission) / latch = Validating,
        Validating + Complete / commit = Ready,
        Validating + Abort / discard = Ready
    }
}

/// State machine extended variables.
pub struct Context {
    engine: AntiReplayEngine,
    pending: Option<(u32, u32)>,
}

impl Context {
    fn new() -> Self {
        Self {
            engine: AntiReplayEngine::new(),
            pending: None,
        }
    }
}

impl StateMachineContext for Context {
    fn latch(&mut self, submission: &Submission) {
        self.pending = Some((submission.counter, submission.nonce));
    }

    fn commit(&mut self) {
        if let Some((counter, nonce)) = self.pending.take() {
            let verdict = self.engine.validate(counter, nonce);
            log::debug!(
                "replay: counter={:#x} nonce={:#010x} verdict={:#x}",
                counter,
                nonce,
                verdict.get()
            );
        }
    }

    fn discard(&mut self) {
        self.pending = None;
    }
}

/// Anti-replay peripheral: counter at +0x00, nonce generator at +0x10 and
/// validator at +0x20.
pub struct AntiReplayBlock {
    counter: MonotonicCounter,
    nonce: NonceGenerator,
    validator: ReplayValidator,
}

impl AntiReplayBlock {
    const COUNTER_BASE: RvAddr = 0x00;
    const NONCE_BASE: RvAddr = 0x10;
    const VALIDATOR_BASE: RvAddr = 0x20;
    const VALIDATOR_END: RvAddr = 0x3F;

    pub fn new(clock: &Clock, nonce_seed: u32) -> Self {
        Self {
            counter: MonotonicCounter::new(),
            nonce: NonceGenerator::new(nonce_seed),
            validator: ReplayValidator::new(clock),
        }
    }

    /// Memory map size.
    pub fn mmap_size(&self) -> RvAddr {
        0x100
    }

    pub fn counter(&self) -> &MonotonicCounter {
        &self.counter
    }

    pub fn nonce(&self) -> &NonceGenerator {
        &self.nonce
    }

    pub fn validator(&self) -> &ReplayValidator {
        &self.validator
    }
}

impl Bus for AntiReplayBlock {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        match addr {
            Self::COUNTER_BASE..=0x0F => self.counter.read(size, addr - Self::COUNTER_BASE),
            Self::NONCE_BASE..=0x1F => self.nonce.read(size, addr - Self::NONCE_BASE),
            Self::VALIDATOR_BASE..=Self::VALIDATOR_END => {
                self.validator.read(size, addr - Self::VALIDATOR_BASE)
            }
            _ => Err(BusError::LoadAccessFault),
        }
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        match addr {
            Self::COUNTER_BASE..=0x0F => self.counter.write(size, addr - Self::COUNTER_BASE, val),
            Self::NONCE_BASE..=0x1F => self.nonce.write(size, addr - Self::NONCE_BASE, val),
            Self::VALIDATOR_BASE..=Self::VALIDATOR_END => {
                self.validator
                    .write(size, addr - Self::VALIDATOR_BASE, val)
            }
            _ => Err(BusError::StoreAccessFault),
        }
    }

    fn poll(&mut self) {
        self.nonce.poll();
        self.validator.poll();
    }
}
