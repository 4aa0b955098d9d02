//! Register Rename Stage.
//!
//! Maps source registers through the thread's rename map and gives every
//! destination a fresh physical register, remembering the mapping it replaces.
//! An empty free list stalls the stage; later instructions wait behind the stalled
//! one so that renaming stays in program order.

use crate::core::cpu::Cpu;
use crate::core::pipeline::dyn_inst::InstStage;

/// Executes the rename stage.
pub fn rename_stage(cpu: &mut Cpu) {
    for _ in 0..cpu.pipeline.rename_width {
        if cpu.rename_queue.len() >= cpu.pipeline.stage_queue_size {
            break;
        }
        let Some(&seq) = cpu.decode_queue.front() else {
            break;
        };
        let Some(inst) = cpu.insts.get_mut(&seq) else {
            let _ = cpu.decode_queue.pop_front();
            continue;
        };
        let map = &mut cpu.rename_maps[inst.thread];

        if let Some(arch) = inst.dest_arch {
            let Some(phys) = cpu.regs.allocate() else {
                cpu.stats.stalls_free_list += 1;
                break;
            };
            inst.src_phys = inst.src_arch.map(|r| r.map(|r| map.lookup(r)));
            inst.prev_phys = Some(map.remap(arch, phys));
            inst.dest_phys = Some(phys);
        } else {
            inst.src_phys = inst.src_arch.map(|r| r.map(|r| map.lookup(r)));
        }

        inst.stage = InstStage::Renamed;
        let _ = cpu.decode_queue.pop_front();
        cpu.rename_queue.push_back(seq);
    }
}
