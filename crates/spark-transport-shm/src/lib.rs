#![deny(unsafe_code)]
#![doc = r#"
# spark-transport-shm

## 设计动机（Why）
- **同机 IPC**：两个进程映射同一个文件，以单生产者/单消费者（SPSC）环形缓冲交换字节，
  绕开内核网络栈，获得最低的同机延迟。
- **统一契约**：实现 [`Connection`](spark_transport::Connection)，与帧化 TCP、UDP 可以互换。

## 核心契约（What）
- **文件布局**：`[0:8)` head（消费者位置）、`[8:16)` tail（生产者位置），均为本机字节序 `u64`；
  `[16:16+C)` 为环形数据区，容量 `C` 默认 [`DEFAULT_CAPACITY`]（64 MiB），两端必须一致；
- head/tail 单调递增、从不回绕，物理偏移为 `counter mod C`，`tail - head` 即未读字节数且不超过 `C`；
- 只有生产者推进 tail，只有消费者推进 head；发布使用 release，观察使用 acquire；
- 环形缓冲不携带消息边界：`read_message` 读取当前全部可用字节。

## 实现策略（How）
- [`MappedRegion`] 独占映射，只对外暴露 [`SharedCounters`]（固定偏移上的原子读/加）
  与 [`RingData`]（带越界检查的字节视图）；
- [`SpscRing`] 实现与存储无关的环形算法，既运行在映射文件上，也运行在进程内的 [`HeapRegion`] 上；
- 等待空间或数据时忙等轮询，每轮短暂休眠，截止时间在调用开始时确定。

## 风险与考量（Trade-offs）
- 文件跨进程重启保留，打开时不重置计数器；监听端在绑定时检测明显损坏的计数器并重置，
  也可以通过 [`ShmOptions::with_reset_on_bind`] 显式重置；
- 仅支持 Unix（`mmap`）。
"#]

mod connection;
mod error;
mod listener;
mod options;
#[allow(unsafe_code)]
mod region;
pub mod ring;
mod sync;

pub use connection::ShmConnection;
pub use listener::ShmListener;
pub use options::{DEFAULT_CAPACITY, HEADER_LEN, ShmOptions};
pub use region::{MappedRegion, RingData, SharedCounters};
pub use ring::{HeapRegion, RingMemory, SpscRing};
