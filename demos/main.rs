// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stands up a [`Processor`] over a sandboxed filesystem backend and drives it through one
//! request, end to end, against an in-process byte slice standing in for guest memory.

use riff_semihost::builder::{Param, RequestBuilder};
use riff_semihost::config::HostConfig;
use riff_semihost::memaccess::SliceMemory;
use riff_semihost::sandbox::SandboxFs;
use riff_semihost::{MemoryAccess, Opcode, Processor};

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let sandbox_root = std::env::temp_dir().join("riff-semihost-demo");
    let mut backend = SandboxFs::builder()
        .root(&sandbox_root)
        .cmdline(b"demo.elf --flag".to_vec())
        .build()
        .expect("failed to initialize sandbox root");

    let config = HostConfig {
        int_size: riff_semihost::wire::IntSize::Four,
        ptr_size: riff_semihost::wire::IntSize::Eight,
        endianness: riff_semihost::Endianness::Little,
    };

    let mut guest = [0u8; 1024];
    let request_len = {
        let builder = RequestBuilder::new(&mut guest[..256], config, true).unwrap();
        builder
            .call(Opcode::Open, &[Param::Data(b"greeting.txt"), Param::Int(4), Param::Int(12)])
            .unwrap()
    };

    let mut memory = SliceMemory::new(0, &mut guest);
    let mut processor: Processor<SliceMemory<'_>, _> = Processor::new();
    processor.process(&mut memory, &mut backend, 0, request_len).expect("guest memory access failed");

    let mut header = [0u8; 8];
    memory.read(0, &mut header).unwrap();
    tracing::info!(tag = ?core::str::from_utf8(&header[..4]), "OPEN response staged in place");
}
