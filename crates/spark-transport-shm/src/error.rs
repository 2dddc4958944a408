use spark_transport::OperationKind;

pub(crate) const OPEN: OperationKind =
    OperationKind::new("spark.transport.shm.open_failed", "shm open");
pub(crate) const MAP: OperationKind =
    OperationKind::new("spark.transport.shm.map_failed", "shm map");
pub(crate) const READ: OperationKind =
    OperationKind::new("spark.transport.shm.read_failed", "shm read");
pub(crate) const WRITE: OperationKind =
    OperationKind::new("spark.transport.shm.write_failed", "shm write");
