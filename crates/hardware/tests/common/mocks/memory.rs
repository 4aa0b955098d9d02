use o3sim_core::common::data::AccessType;
use o3sim_core::config::Config;
use o3sim_core::sim::EventQueue;
use o3sim_core::soc::memory::{MemRequest, MemResponse, MemoryHost, MemorySystem, Token};

/// Owns a memory hierarchy without any CPU and keeps the responses it receives.
#[derive(Debug)]
pub struct RecordingHost {
    pub memory: MemorySystem,
    pub delivered: Vec<MemResponse>,
}

impl RecordingHost {
    pub fn new(config: &Config) -> (Self, EventQueue<Self>) {
        let memory = MemorySystem::new(config).unwrap();
        (
            Self {
                memory,
                delivered: Vec::new(),
            },
            EventQueue::new(),
        )
    }

    /// Fires events until the queue is empty.
    pub fn drain(&mut self, queue: &mut EventQueue<Self>) {
        while queue.advance(self).is_ok() {}
    }

    /// Response for the load tagged `seq`, if delivered.
    pub fn response(&self, seq: u64) -> Option<&MemResponse> {
        self.delivered
            .iter()
            .find(|r| r.request.token == Token::Inst(seq))
    }
}

impl MemoryHost for RecordingHost {
    fn memory(&mut self) -> &mut MemorySystem {
        &mut self.memory
    }

    fn deliver(&mut self, response: MemResponse, _queue: &mut EventQueue<Self>) {
        self.delivered.push(response);
    }
}

/// A data load from CPU `cpu`, thread 0, tagged with `seq`.
pub fn load_req(cpu: usize, addr: u64, seq: u64) -> MemRequest {
    MemRequest::new(cpu, 0, addr, AccessType::Load, Token::Inst(seq))
}
