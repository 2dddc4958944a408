//! 帧编解码的性质测试。
//!
//! # 教案式说明
//! - **Why**：底层套接字可以在任意位置短读，帧读取器必须在所有切分方式下保持消息边界。
//! - **How**：以 `proptest` 生成任意负载序列与任意读取切分长度，经内存读取器回放。
//! - **What**：逐条读回的消息与写入序列完全一致，且读完后没有残留字节。

use std::io::{self, Read};

use proptest::collection::vec;
use proptest::prelude::*;
use spark_transport_tcp::{DEFAULT_MAX_FRAME_LEN, FrameReader, encode_frame};

/// 每次最多返回 `chunks` 中下一个长度的内存读取器。
struct Chunked {
    data: Vec<u8>,
    offset: usize,
    chunks: Vec<usize>,
    turn: usize,
}

impl Read for Chunked {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = self.chunks[self.turn % self.chunks.len()];
        self.turn += 1;
        let n = limit.min(buf.len()).min(self.data.len() - self.offset);
        buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

fn wire(payloads: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for payload in payloads {
        let frame = encode_frame(payload, DEFAULT_MAX_FRAME_LEN).expect("编码帧");
        out.extend_from_slice(&frame);
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn single_frame_round_trips(payload in vec(any::<u8>(), 0..4096)) {
        let data = wire(std::slice::from_ref(&payload));
        prop_assert_eq!(data.len(), payload.len() + 4);

        let mut reader = FrameReader::new(io::Cursor::new(data));
        let mut buf = vec![0u8; payload.len()];
        let n = reader.read_frame_into(&mut buf).expect("读取帧");
        prop_assert_eq!(&buf[..n], payload.as_slice());
    }

    #[test]
    fn message_sequence_survives_arbitrary_chunking(
        payloads in vec(vec(any::<u8>(), 0..512), 1..16),
        chunks in vec(1usize..64, 1..8),
    ) {
        let mut reader = FrameReader::new(Chunked {
            data: wire(&payloads),
            offset: 0,
            chunks,
            turn: 0,
        });
        for expected in &payloads {
            let got = reader.read_frame().expect("读取帧");
            prop_assert_eq!(&got, expected);
        }
        prop_assert_eq!(reader.buffered(), 0);
        prop_assert!(!reader.is_desynchronized());
    }
}
