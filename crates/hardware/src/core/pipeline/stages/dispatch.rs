//! Dispatch Stage.
//!
//! Places renamed instructions into the reorder buffer and the issue queue, in
//! order, while both have room.

use crate::core::cpu::Cpu;
use crate::core::pipeline::dyn_inst::InstStage;

/// Executes the dispatch stage.
pub fn dispatch_stage(cpu: &mut Cpu) {
    for _ in 0..cpu.pipeline.dispatch_width {
        let Some(&seq) = cpu.rename_queue.front() else {
            break;
        };
        if cpu.rob.is_full() {
            cpu.stats.stalls_rob_full += 1;
            break;
        }
        if cpu.iq.is_full() {
            cpu.stats.stalls_iq_full += 1;
            break;
        }
        let _ = cpu.rename_queue.pop_front();
        let Some(inst) = cpu.insts.get_mut(&seq) else {
            continue;
        };
        inst.stage = InstStage::Dispatched;
        let _ = cpu.rob.allocate(seq, inst.thread);
        let _ = cpu.iq.insert(seq, inst.thread);
    }
}
