//! Commit Stage.
//!
//! Retires instructions in program order, per thread, up to `commit_width` per
//! cycle. It performs the following:
//! 1. **Interrupts:** Before committing, a thread with a pending and enabled interrupt
//!    is flushed back to its commit point and redirected to the handler.
//! 2. **Faults:** A faulting instruction at the head stops the CPU with its fault.
//! 3. **Stores:** Write the L1D; a rejected write stalls commit for the cycle.
//! 4. **Retirement:** Frees the replaced physical register, re-enables interrupts on
//!    a return from the handler and ends the thread on an exit.

use tracing::{debug, info, warn};

use crate::common::data::AccessType;
use crate::core::cpu::context::ThreadStatus;
use crate::core::cpu::{CommitRecord, Cpu};
use crate::core::pipeline::dyn_inst::InstStage;
use crate::sim::event::EventQueue;
use crate::soc::memory::{MemRequest, MemoryHost, MemorySystem, SendStatus, Token};

/// Executes the commit stage.
pub fn commit_stage<H: MemoryHost>(cpu: &mut Cpu, mem: &mut MemorySystem, queue: &mut EventQueue<H>) {
    let now = queue.now();
    take_interrupts(cpu);

    let mut committed = 0;
    while committed < cpu.pipeline.commit_width {
        let Some(head) = cpu.rob.peek_head() else {
            break;
        };
        let Some(inst) = cpu.insts.get(&head.seq) else {
            let _ = cpu.rob.commit_head();
            continue;
        };
        if inst.stage != InstStage::WrittenBack {
            break;
        }
        debug_assert!(!inst.wrong_path, "wrong-path instruction reached commit");
        let (seq, t) = (inst.seq, inst.thread);

        if let Some(fault) = inst.fault {
            warn!(cpu = cpu.id, thread = t, pc = inst.pc(), %fault, "fault at commit");
            cpu.fault = Some((t, fault));
            return;
        }

        if inst.needs_store_access() {
            let addr = inst.mem_addr.unwrap_or_default();
            let req = MemRequest::new(cpu.id, t, addr, AccessType::Store, Token::StoreCommit(seq));
            if mem.send(req, queue) == SendStatus::Rejected {
                cpu.stats.store_rejections += 1;
                break;
            }
        }

        let _ = cpu.rob.commit_head();
        let Some(inst) = cpu.insts.remove(&seq) else {
            break;
        };
        if let Some(prev) = inst.prev_phys {
            cpu.regs.release(prev);
        }
        cpu.stats.record_commit(inst.op_class);
        if let Some(log) = cpu.commit_log.as_mut() {
            log.push(CommitRecord {
                thread: t,
                seq,
                pc: inst.pc(),
                tick: now,
            });
        }

        let ctx = &mut cpu.threads[t];
        ctx.committed += 1;
        if inst.is_eret() {
            ctx.interrupts.eret();
        }
        let exit = inst.exit_code();
        if let Some(code) = exit {
            ctx.status = ThreadStatus::Exited(code);
            info!(cpu = cpu.id, thread = t, code, tick = now, "thread exited");
        }

        committed += 1;
        cpu.note_commit(t);
        if exit.is_some() {
            cpu.squash(t, seq);
        }
        if cpu.inst_limit_reached {
            break;
        }
    }
}

/// Takes at most one interrupt per thread at the commit boundary.
fn take_interrupts(cpu: &mut Cpu) {
    for t in 0..cpu.threads.len() {
        let ctx = &cpu.threads[t];
        if !ctx.is_active() || !ctx.interrupts.can_take() {
            continue;
        }
        let Some(handler) = ctx.workload.interrupt_handler() else {
            continue;
        };

        cpu.squash(t, 0);
        let ctx = &mut cpu.threads[t];
        let Some(vector) = ctx.interrupts.take() else {
            continue;
        };
        ctx.state.epc = ctx.arch_pc;
        ctx.arch_pc = handler;
        cpu.fetch[t].pc = handler;
        cpu.stats.interrupts_taken += 1;
        debug!(cpu = cpu.id, thread = t, vector, epc = ctx.state.epc, handler, "interrupt taken");
    }
}
