use crate::state::StateVisitor;

/// Counter model, fixed for the lifetime of the owning board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqMode {
    /// Decrements by the tick delta; fires the instant the count crosses
    /// from non-negative to negative, then clamps at zero until the next
    /// reload write.
    EdgeCountdown,
    /// Clock-ratio divider: the accumulator gains `delta * step` per tick
    /// and sheds `threshold` per logical increment. The 8-bit logical
    /// counter fires on rollover past 0xFF and reloads. A step/threshold of
    /// 3/341 models the Konami scanline-equivalent clock.
    CycleAccumulate { step: u16, threshold: u16 },
    /// 16-bit up-counter; fires on wrap past 0xFFFF, then reloads.
    FreeRunning,
}

/// The interrupt counter state machine shared by every board that raises
/// IRQs. The external driver calls `tick` once per CPU instruction batch or
/// per scanline, whichever clock domain the board's hardware counts.
#[derive(Debug)]
pub struct IrqCounter {
    mode: IrqMode,
    enabled: bool,
    count: i32,
    reload: u16,
    accumulator: u32,
    clamped: bool,
    line: bool,
}

impl IrqCounter {
    pub fn new(mode: IrqMode) -> Self {
        Self {
            mode,
            enabled: false,
            count: 0,
            reload: 0,
            accumulator: 0,
            clamped: false,
            line: false,
        }
    }

    pub fn power_on(&mut self) {
        self.enabled = false;
        self.count = 0;
        self.reload = 0;
        self.accumulator = 0;
        self.clamped = false;
        self.line = false;
    }

    pub fn mode(&self) -> IrqMode {
        self.mode
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Gates ticking and firing only; count, reload, and the prescaler
    /// accumulator are preserved so re-enabling resumes exactly where the
    /// counter stopped.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn count(&self) -> i32 {
        self.count
    }

    pub fn reload(&self) -> u16 {
        self.reload
    }

    pub fn set_reload(&mut self, reload: u16) {
        self.reload = reload;
    }

    pub fn set_reload_lo(&mut self, value: u8) {
        self.reload = (self.reload & 0xFF00) | u16::from(value);
    }

    pub fn set_reload_hi(&mut self, value: u8) {
        self.reload = (self.reload & 0x00FF) | (u16::from(value) << 8);
    }

    /// Loads the counter from the reload latch and re-arms a clamped
    /// countdown. Also resets the prescaler accumulator, matching hardware
    /// that restarts its divider on a counter load.
    pub fn reload_now(&mut self) {
        self.count = match self.mode {
            IrqMode::CycleAccumulate { .. } => i32::from(self.reload & 0x00FF),
            _ => i32::from(self.reload),
        };
        self.accumulator = 0;
        self.clamped = false;
    }

    /// Deasserts the interrupt line. Enable state is the board's business.
    pub fn acknowledge(&mut self) {
        self.line = false;
    }

    pub fn line(&self) -> bool {
        self.line
    }

    /// Advances the counter by `delta` external clocks. Returns whether the
    /// terminal condition fired during this call; the line stays asserted
    /// until acknowledged.
    pub fn tick(&mut self, delta: u32) -> bool {
        if !self.enabled || delta == 0 {
            return false;
        }

        let fired = match self.mode {
            IrqMode::EdgeCountdown => {
                if self.clamped {
                    false
                } else {
                    self.count -= delta as i32;
                    if self.count < 0 {
                        self.count = 0;
                        self.clamped = true;
                        true
                    } else {
                        false
                    }
                }
            }
            IrqMode::CycleAccumulate { step, threshold } => {
                self.accumulator += delta * u32::from(step);
                let threshold = u32::from(threshold);
                let mut fired = false;
                while self.accumulator >= threshold {
                    self.accumulator -= threshold;
                    if self.count >= 0xFF {
                        self.count = i32::from(self.reload & 0x00FF);
                        fired = true;
                    } else {
                        self.count += 1;
                    }
                }
                fired
            }
            IrqMode::FreeRunning => {
                let mut remaining = delta;
                let mut fired = false;
                while remaining > 0 {
                    let until_wrap = 0x1_0000 - self.count as u32;
                    if remaining >= until_wrap {
                        remaining -= until_wrap;
                        self.count = i32::from(self.reload);
                        fired = true;
                    } else {
                        self.count += remaining as i32;
                        remaining = 0;
                    }
                }
                fired
            }
        };

        if fired {
            self.line = true;
        }
        fired
    }

    pub(crate) fn visit_state(&mut self, v: &mut dyn StateVisitor) {
        v.flag("irq.enabled", &mut self.enabled);
        let mut count_bits = self.count as u32;
        v.u32("irq.count", &mut count_bits);
        self.count = count_bits as i32;
        v.u16("irq.reload", &mut self.reload);
        v.u32("irq.acc", &mut self.accumulator);
        v.flag("irq.clamped", &mut self.clamped);
        v.flag("irq.line", &mut self.line);
        // Snapshots are host input; force the count back into the mode's
        // representable range so tick arithmetic stays in bounds.
        self.count = match self.mode {
            IrqMode::EdgeCountdown => self.count.max(0),
            IrqMode::CycleAccumulate { .. } => self.count & 0xFF,
            IrqMode::FreeRunning => self.count & 0xFFFF,
        };
    }
}
