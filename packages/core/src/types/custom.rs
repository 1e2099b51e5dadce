use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// An application-defined value the engine knows nothing about.
///
/// Custom values are leaves: they are never descended into, and they reach
/// the wire only through a codec registered for their type name. Equality
/// is identity of the shared payload.
#[derive(Clone)]
pub struct CustomValue {
    type_name: Cow<'static, str>,
    data: Arc<dyn Any + Send + Sync>,
}

impl CustomValue {
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<Cow<'static, str>>, data: T) -> Self {
        CustomValue {
            type_name: type_name.into(),
            data: Arc::new(data),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.data.is::<T>()
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomValue({})", self.type_name)
    }
}
