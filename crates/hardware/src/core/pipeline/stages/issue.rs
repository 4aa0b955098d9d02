//! Issue Stage.
//!
//! Selects ready instructions from the issue queue, oldest first, up to
//! `issue_width` per cycle. An instruction issues when:
//! 1. **Operands:** Every physical source register is ready.
//! 2. **Functional unit:** A unit of the needed kind is free this cycle.
//! 3. **Data cache:** A correct-path load's L1D request is accepted. A rejected
//!    request leaves the load in the queue to retry next cycle.
//!
//! Loads complete when their memory response arrives; everything else completes
//! after the unit's latency.

use std::cmp::Reverse;

use tracing::trace;

use crate::common::data::AccessType;
use crate::core::cpu::Cpu;
use crate::core::pipeline::dyn_inst::InstStage;
use crate::core::units::fu::FuKind;
use crate::sim::event::EventQueue;
use crate::soc::memory::{MemRequest, MemoryHost, MemorySystem, SendStatus, Token};

/// Executes the issue stage.
pub fn issue_stage<H: MemoryHost>(cpu: &mut Cpu, mem: &mut MemorySystem, queue: &mut EventQueue<H>) {
    let now = queue.now();
    let mut issued = 0;

    for seq in cpu.iq.oldest_first() {
        if issued >= cpu.pipeline.issue_width {
            break;
        }
        let Some(inst) = cpu.insts.get(&seq) else {
            continue;
        };
        let ready = inst.src_phys.iter().flatten().all(|&p| cpu.regs.is_ready(p));
        if !ready {
            continue;
        }
        let kind = FuKind::for_class(inst.op_class);
        if let Some(kind) = kind {
            if !cpu.fu.available(kind, now) {
                cpu.stats.fu_busy += 1;
                continue;
            }
        }

        let thread = inst.thread;
        let mut waits_for_memory = false;
        if inst.needs_load_access() && !inst.wrong_path {
            let addr = inst.mem_addr.unwrap_or_default();
            let req = MemRequest::new(cpu.id, thread, addr, AccessType::Load, Token::Inst(seq));
            match mem.send(req, queue) {
                SendStatus::Hit | SendStatus::Miss => waits_for_memory = true,
                SendStatus::Rejected => {
                    cpu.stats.load_rejections += 1;
                    continue;
                }
                SendStatus::OutOfRange => {}
            }
        }

        let latency = match kind {
            Some(kind) => cpu.fu.acquire(kind, now).unwrap_or(1),
            None => 1,
        };
        let _ = cpu.iq.remove(seq, thread);
        if let Some(inst) = cpu.insts.get_mut(&seq) {
            inst.stage = InstStage::Issued;
            inst.issue_tick = Some(now);
            inst.waiting_on_memory = waits_for_memory;
        }
        if !waits_for_memory {
            cpu.executing.push(Reverse((now + latency * cpu.period, seq)));
        }
        trace!(cpu = cpu.id, seq, thread, latency, waits_for_memory, "issue");
        issued += 1;
    }
}
