//! Instruction Fetch Stage.
//!
//! This module implements the first stage of the pipeline. Each cycle it:
//! 1. **Selects a thread:** Round-robin over active, unhalted threads; the first
//!    thread that makes progress owns the cycle.
//! 2. **Reads the L1I:** One instruction block at a time. A missing block is requested
//!    with the thread's fetch epoch and fetch waits for the response.
//! 3. **Predicts:** Static next-PC prediction (direct jumps taken, everything else
//!    falls through). A predicted-taken jump ends the fetch group.
//! 4. **Executes functionally:** Correct-path instructions are executed against the
//!    thread's state in program order and keep an undo record. A prediction that
//!    disagrees with the executed next PC switches the thread to the wrong path
//!    until the branch resolves.

use tracing::trace;

use crate::common::constants::INSTRUCTION_SIZE;
use crate::common::data::AccessType;
use crate::common::error::Fault;
use crate::core::cpu::Cpu;
use crate::core::pipeline::dyn_inst::DynInst;
use crate::isa::workload::ExecOutcome;
use crate::sim::event::EventQueue;
use crate::soc::memory::{MemRequest, MemoryHost, MemorySystem, SendStatus, Token};

/// Executes the fetch stage.
pub fn fetch_stage<H: MemoryHost>(cpu: &mut Cpu, mem: &mut MemorySystem, queue: &mut EventQueue<H>) {
    let n = cpu.threads.len();
    for i in 0..n {
        let t = (cpu.fetch_rr + i) % n;
        if fetch_thread(cpu, t, mem, queue) {
            cpu.fetch_rr = (t + 1) % n;
            return;
        }
    }
}

/// Fetches for one thread. Returns true if the thread used the cycle.
fn fetch_thread<H: MemoryHost>(cpu: &mut Cpu, t: usize, mem: &mut MemorySystem, queue: &mut EventQueue<H>) -> bool {
    if !cpu.threads[t].is_active() || cpu.fetch[t].halted {
        return false;
    }
    if cpu.fetch_queue.len() >= cpu.pipeline.fetch_queue_size {
        return false;
    }

    let now = queue.now();
    let l1i = &mem.cpus[cpu.id].l1i;
    let block = l1i.block_addr(cpu.fetch[t].pc);

    if cpu.fetch[t].block != Some(block) {
        if cpu.fetch[t].pending == Some(block) {
            cpu.stats.stalls_icache += 1;
            return false;
        }
        let pc = cpu.fetch[t].pc;
        if cpu.threads[t].workload.fetch(pc).is_none() {
            return unmapped_pc(cpu, t, pc, now);
        }
        let epoch = cpu.fetch[t].epoch;
        let req = MemRequest::new(cpu.id, t, block, AccessType::Fetch, Token::Fetch { epoch });
        return match mem.send(req, queue) {
            SendStatus::Hit | SendStatus::Miss => {
                cpu.fetch[t].pending = Some(block);
                trace!(cpu = cpu.id, thread = t, block, epoch, "fetch request");
                true
            }
            SendStatus::Rejected => {
                cpu.stats.fetch_rejections += 1;
                false
            }
            SendStatus::OutOfRange => unmapped_pc(cpu, t, pc, now),
        };
    }

    let mut fetched = 0;
    while fetched < cpu.pipeline.fetch_width && cpu.fetch_queue.len() < cpu.pipeline.fetch_queue_size {
        let pc = cpu.fetch[t].pc;
        if mem.cpus[cpu.id].l1i.block_addr(pc) != block {
            break;
        }
        let Some(inst) = cpu.threads[t].workload.fetch(pc) else {
            if fetched == 0 {
                return unmapped_pc(cpu, t, pc, now);
            }
            break;
        };

        let seq = cpu.alloc_seq();
        let mut dyn_inst = DynInst::new(seq, t, inst, now);
        let predicted = inst.direct_target().unwrap_or(pc + INSTRUCTION_SIZE);
        dyn_inst.predicted_next = predicted;

        if cpu.fetch[t].wrong_path {
            dyn_inst.wrong_path = true;
            cpu.stats.fetched_wrong_path += 1;
        } else {
            let ctx = &mut cpu.threads[t];
            let outcome = if inst.registers_valid() {
                ctx.workload.execute(&inst, &ctx.state)
            } else {
                ExecOutcome::faulted(pc, Fault::IllegalInstruction { pc })
            };
            dyn_inst.undo = Some(ctx.apply(inst.dest(), &outcome));
            dyn_inst.fault = outcome.fault;
            dyn_inst.mem_addr = outcome.mem.map(|m| m.addr);
            dyn_inst.outcome = Some(outcome);

            if outcome.next_pc != predicted {
                dyn_inst.mispredicted = true;
                cpu.fetch[t].wrong_path = true;
            }
            if outcome.fault.is_some() || outcome.exit_code.is_some() {
                cpu.fetch[t].halted = true;
            }
        }

        let _ = cpu.insts.insert(seq, dyn_inst);
        cpu.fetch_queue.push_back(seq);
        cpu.stats.fetched += 1;
        fetched += 1;
        cpu.fetch[t].pc = predicted;

        if cpu.fetch[t].halted || predicted != pc + INSTRUCTION_SIZE {
            break;
        }
    }
    fetched > 0
}

/// Handles a PC that holds no instruction. On the correct path this becomes a
/// faulting placeholder that terminates the run at commit; on the wrong path the
/// thread just stops fetching until the squash redirects it.
fn unmapped_pc(cpu: &mut Cpu, t: usize, pc: u64, now: u64) -> bool {
    cpu.fetch[t].halted = true;
    if cpu.fetch[t].wrong_path {
        return false;
    }
    let seq = cpu.alloc_seq();
    let _ = cpu.insts.insert(seq, DynInst::fetch_fault(seq, t, pc, now));
    cpu.fetch_queue.push_back(seq);
    cpu.stats.fetched += 1;
    true
}
