//! Micro-ISA program images.
//!
//! A `Program` is a flat array of `MicroOp`s placed at consecutive 4-byte PCs from
//! `base`, plus an optional initial data image and interrupt handler. Programs are
//! either loaded from a JSON image or synthesized: `Program::echo` builds the
//! default workload, which writes its arguments into a memory buffer and exits.
//!
//! JSON image format:
//!
//! ```json
//! {
//!   "name": "sum",
//!   "base": 4096,
//!   "code": [
//!     { "op": "li", "rd": 1, "imm": 3 },
//!     { "op": "alu_imm", "func": "add", "rd": 1, "rs1": 1, "imm": 4 },
//!     { "op": "exit", "rs1": 0 }
//!   ],
//!   "data": [[256, 42]],
//!   "interrupt_handler": null
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::common::constants::{INSTRUCTION_SIZE, NUM_ARCH_REGS};
use crate::common::error::SimError;
use crate::core::cpu::context::ArchState;
use crate::isa::inst::{MicroOp, StaticInst};
use crate::isa::workload::Workload;

/// Default load address of program code.
pub const DEFAULT_BASE: u64 = 0x1_0000;

/// Buffer the echo program writes its output to.
const ECHO_BUFFER: u64 = 0x8000;

/// A byte string stored little-endian, eight bytes per word, starting at `addr`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct OutputRegion {
    /// Address of the first word.
    pub addr: u64,
    /// Length in bytes.
    pub len: u64,
}

/// A loaded micro-ISA program.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Program {
    /// Program name shown in logs.
    #[serde(default = "Program::default_name")]
    pub name: String,
    /// Address of the first instruction.
    #[serde(default = "Program::default_base")]
    pub base: u64,
    /// Entry PC; defaults to `base`.
    #[serde(default)]
    pub entry: Option<u64>,
    /// Instructions, one per 4-byte slot.
    pub code: Vec<MicroOp>,
    /// Initial memory words as `[addr, value]` pairs.
    #[serde(default)]
    pub data: Vec<(u64, u64)>,
    /// Interrupt handler PC.
    #[serde(default)]
    pub interrupt_handler: Option<u64>,
    /// Region holding the program's textual output.
    #[serde(default)]
    pub output: Option<OutputRegion>,
}

impl Program {
    fn default_name() -> String {
        "program".to_string()
    }

    fn default_base() -> u64 {
        DEFAULT_BASE
    }

    /// Creates a program from code placed at `DEFAULT_BASE`.
    pub fn new(code: Vec<MicroOp>) -> Self {
        Self {
            name: Self::default_name(),
            base: DEFAULT_BASE,
            entry: None,
            code,
            data: Vec::new(),
            interrupt_handler: None,
            output: None,
        }
    }

    /// Sets the program name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the interrupt handler to the instruction at `index`.
    pub fn with_interrupt_handler(mut self, index: usize) -> Self {
        self.interrupt_handler = Some(self.pc_of(index));
        self
    }

    /// Adds initial memory words.
    pub fn with_data(mut self, words: impl IntoIterator<Item = (u64, u64)>) -> Self {
        self.data.extend(words);
        self
    }

    /// PC of the instruction at `index`.
    pub fn pc_of(&self, index: usize) -> u64 {
        self.base + index as u64 * INSTRUCTION_SIZE
    }

    /// Builds the default echo-like workload: each 8-byte chunk of
    /// `"<args joined by spaces>\n"` is loaded into a register and stored to an
    /// output buffer, then the thread exits with code 0. A `nop; eret` interrupt
    /// handler follows the exit.
    pub fn echo(args: &[String]) -> Self {
        let mut text = args.join(" ").into_bytes();
        text.push(b'\n');

        let mut code = vec![MicroOp::Li {
            rd: 1,
            imm: ECHO_BUFFER as i64,
        }];
        for (i, chunk) in text.chunks(8).enumerate() {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            code.push(MicroOp::Li {
                rd: 2,
                imm: i64::from_le_bytes(word),
            });
            code.push(MicroOp::Store {
                rs2: 2,
                rs1: 1,
                offset: (i * 8) as i64,
            });
        }
        code.push(MicroOp::Exit { rs1: 0 });
        let handler = code.len();
        code.push(MicroOp::Nop);
        code.push(MicroOp::Eret);

        let mut program = Self::new(code).named("echo").with_interrupt_handler(handler);
        program.output = Some(OutputRegion {
            addr: ECHO_BUFFER,
            len: text.len() as u64,
        });
        program
    }

    /// Parses a JSON program image.
    pub fn from_json(text: &str) -> Result<Self, SimError> {
        let program: Self =
            serde_json::from_str(text).map_err(|e| SimError::Workload(format!("bad program image: {e}")))?;
        if program.code.is_empty() {
            return Err(SimError::Workload(format!("program `{}` has no code", program.name)));
        }
        if let Some(index) = program
            .code
            .iter()
            .enumerate()
            .position(|(i, &op)| !StaticInst::new(program.pc_of(i), op).registers_valid())
        {
            return Err(SimError::Workload(format!(
                "program `{}`: instruction {index} at {:#x} names a register outside r0-r{}",
                program.name,
                program.pc_of(index),
                NUM_ARCH_REGS - 1
            )));
        }
        Ok(program)
    }

    /// Reads and parses a JSON program image from disk.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimError::Workload(format!("cannot read {}: {e}", path.display())))?;
        let mut program = Self::from_json(&text)?;
        if program.name == Self::default_name() {
            program.name = path.display().to_string();
        }
        Ok(program)
    }
}

impl Workload for Program {
    fn name(&self) -> &str {
        &self.name
    }

    fn entry_pc(&self, _thread: usize) -> u64 {
        self.entry.unwrap_or(self.base)
    }

    fn fetch(&self, pc: u64) -> Option<StaticInst> {
        let offset = pc.checked_sub(self.base)?;
        if offset % INSTRUCTION_SIZE != 0 {
            return None;
        }
        self.code
            .get((offset / INSTRUCTION_SIZE) as usize)
            .map(|&op| StaticInst::new(pc, op))
    }

    fn interrupt_handler(&self) -> Option<u64> {
        self.interrupt_handler
    }

    fn initial_memory(&self) -> Vec<(u64, u64)> {
        self.data.clone()
    }

    fn output(&self, state: &ArchState) -> Option<String> {
        let region = self.output?;
        let bytes: Vec<u8> = (0..region.len.div_ceil(8))
            .flat_map(|i| state.load(region.addr + i * 8).to_le_bytes())
            .take(region.len as usize)
            .collect();
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Binds the configured binary and arguments to a workload.
///
/// A path ending in `.json` is loaded as a program image. Any other path runs the
/// built-in echo program over `args`.
pub fn load_workload(binary_path: &str, args: &[String]) -> Result<Arc<dyn Workload>, SimError> {
    let path = Path::new(binary_path);
    if path.extension().is_some_and(|ext| ext == "json") {
        let program = Program::load(path)?;
        debug!(program = %program.name, insts = program.code.len(), "loaded program image");
        return Ok(Arc::new(program));
    }

    if path.file_name().is_some_and(|name| name == "echo") {
        debug!(binary = binary_path, "running built-in echo");
    } else {
        warn!(
            binary = binary_path,
            "not a micro-ISA program image; running built-in echo over the arguments"
        );
    }
    Ok(Arc::new(Program::echo(args).named(binary_path)))
}
