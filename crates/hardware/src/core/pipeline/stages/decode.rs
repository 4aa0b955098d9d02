//! Instruction Decode Stage.
//!
//! Moves up to `decode_width` instructions per cycle from the fetch queue into the
//! decode queue. Instructions arrive already decoded from the workload, so the stage
//! models only bandwidth and the one-cycle hop.

use crate::core::cpu::Cpu;
use crate::core::pipeline::dyn_inst::InstStage;

/// Executes the decode stage.
pub fn decode_stage(cpu: &mut Cpu) {
    for _ in 0..cpu.pipeline.decode_width {
        if cpu.decode_queue.len() >= cpu.pipeline.stage_queue_size {
            break;
        }
        let Some(seq) = cpu.fetch_queue.pop_front() else {
            break;
        };
        if let Some(inst) = cpu.insts.get_mut(&seq) {
            inst.stage = InstStage::Decoded;
        }
        cpu.decode_queue.push_back(seq);
    }
}
