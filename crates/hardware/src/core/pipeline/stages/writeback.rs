//! Writeback Stage.
//!
//! Collects results from the functional units and the data cache, then writes back
//! up to `writeback_width` of them per cycle. It performs the following:
//! 1. **Completion:** Instructions whose functional unit latency has expired move
//!    from `Issued` to `Executed`. Loads get there when their data returns.
//! 2. **Wakeup:** Marks the destination physical register ready.
//! 3. **Branch resolution:** A control instruction whose static prediction was wrong
//!    squashes every younger instruction of its thread and redirects fetch to the
//!    correct path.

use std::cmp::Reverse;

use crate::common::units::Tick;
use crate::core::cpu::Cpu;
use crate::core::pipeline::dyn_inst::InstStage;

/// Executes the writeback stage.
pub fn writeback_stage(cpu: &mut Cpu, now: Tick) {
    complete_executing(cpu, now);

    let mut written = 0;
    while written < cpu.pipeline.writeback_width {
        let Some(seq) = cpu.executed.pop_front() else {
            break;
        };
        let Some(inst) = cpu.insts.get_mut(&seq) else {
            continue;
        };
        if inst.stage != InstStage::Executed {
            continue;
        }

        inst.stage = InstStage::WrittenBack;
        inst.writeback_tick = Some(now);
        if let Some(p) = inst.dest_phys {
            cpu.regs.mark_ready(p);
        }
        written += 1;

        if inst.inst.is_control() && !inst.wrong_path {
            if inst.mispredicted {
                cpu.stats.branch_mispredictions += 1;
                let thread = inst.thread;
                cpu.squash(thread, seq);
            } else {
                cpu.stats.branch_predictions += 1;
            }
        }
    }
}

/// Moves every instruction whose result is due by `now` to `Executed`.
fn complete_executing(cpu: &mut Cpu, now: Tick) {
    while let Some(&Reverse((ready, seq))) = cpu.executing.peek() {
        if ready > now {
            break;
        }
        let _ = cpu.executing.pop();
        match cpu.insts.get_mut(&seq) {
            Some(inst) if inst.stage == InstStage::Issued && !inst.waiting_on_memory => {
                inst.stage = InstStage::Executed;
                cpu.executed.push_back(seq);
            }
            _ => {}
        }
    }
}
