//! Context tag keys understood by the ingestion schema.

pub const APPLICATION_VERSION: &str = "ai.application.ver";
pub const CLOUD_ROLE: &str = "ai.cloud.role";
pub const CLOUD_ROLE_INSTANCE: &str = "ai.cloud.roleInstance";
pub const DEVICE_ID: &str = "ai.device.id";
pub const DEVICE_OS_VERSION: &str = "ai.device.osVersion";
pub const DEVICE_TYPE: &str = "ai.device.type";
pub const INTERNAL_SDK_VERSION: &str = "ai.internal.sdkVersion";
pub const OPERATION_ID: &str = "ai.operation.id";
pub const OPERATION_NAME: &str = "ai.operation.name";
pub const OPERATION_PARENT_ID: &str = "ai.operation.parentId";
