//!
//! ``evbus-core/src/registry/handler.rs``
//!
//! Type-erased handlers with an explicit runtime signature.
//!
//! A [`Handler`] wraps any `Fn(A0, .., An) -> R` (up to six parameters) and
//! records the `TypeId` of every parameter and of the return type. Calls go
//! through a `&[&dyn Any]` argument slice; each argument is checked against the
//! recorded tag and cloned out before the closure runs.
//!
use std::{
    any::{self, Any, TypeId},
    fmt,
    sync::Arc,
};

use smallvec::{SmallVec, smallvec};

use crate::error::{EventError, EventResult};
use crate::registry::EventId;

/// Boxed return value of a handler invocation
pub type Value = Box<dyn Any + Send>;

type ErasedFn = dyn Fn(&[&dyn Any]) -> Result<Value, usize> + Send + Sync;

/// Runtime tag for one parameter or return type
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Full type path, e.g. `evbus_core::demo::ParamTest`
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment for non-generic types, full path otherwise
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        if self.name.contains('<') {
            return self.name;
        }

        self.name.rsplit("::").next().unwrap_or(self.name)
    }

    #[inline]
    #[must_use]
    pub fn matches(&self, value: &dyn Any) -> bool {
        value.type_id() == self.id
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Parameter tags plus return tag; every handler under one id shares one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: SmallVec<[TypeTag; 4]>,
    ret: TypeTag,
}

impl Signature {
    #[must_use]
    pub fn new(params: SmallVec<[TypeTag; 4]>, ret: TypeTag) -> Self {
        Self { params, ret }
    }

    #[must_use]
    pub fn params(&self) -> &[TypeTag] {
        &self.params
    }

    #[must_use]
    pub const fn ret(&self) -> &TypeTag {
        &self.ret
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Check a call site's arguments: arity first, then each argument's type
    pub fn check_args(&self, id: EventId, args: &[&dyn Any]) -> EventResult<()> {
        if args.len() != self.params.len() {
            return Err(EventError::ArityMismatch {
                id,
                expected: self.params.len(),
                found: args.len(),
            });
        }

        for (index, (tag, arg)) in self.params.iter().zip(args.iter()).enumerate() {
            if !tag.matches(*arg) {
                return Err(EventError::ArgumentTypeMismatch {
                    id,
                    index,
                    expected: tag.name(),
                });
            }
        }

        Ok(())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// Closures convertible into a [`Handler`].
///
/// `Marker` is the closure's `fn` pointer type; it only exists to keep the
/// per-arity impls apart.
pub trait IntoHandler<Marker>: Send + Sync + 'static {
    fn signature() -> Signature;

    fn into_erased(self) -> Box<ErasedFn>;
}

macro_rules! impl_into_handler {
    ($($param:ident => $idx:tt),*) => {
        impl<Func, Ret, $($param,)*> IntoHandler<fn($($param,)*) -> Ret> for Func
        where
            Func: Fn($($param),*) -> Ret + Send + Sync + 'static,
            Ret: Any + Send,
            $($param: Any + Clone,)*
        {
            fn signature() -> Signature {
                Signature::new(smallvec![$(TypeTag::of::<$param>()),*], TypeTag::of::<Ret>())
            }

            fn into_erased(self) -> Box<ErasedFn> {
                Box::new(move |args: &[&dyn Any]| -> Result<Value, usize> {
                    let _ = args;
                    let ret: Ret = (self)($(
                        args[$idx].downcast_ref::<$param>().ok_or::<usize>($idx)?.clone()
                    ),*);
                    Ok(Box::new(ret) as Value)
                })
            }
        }
    };
}

impl_into_handler!();
impl_into_handler!(A0 => 0);
impl_into_handler!(A0 => 0, A1 => 1);
impl_into_handler!(A0 => 0, A1 => 1, A2 => 2);
impl_into_handler!(A0 => 0, A1 => 1, A2 => 2, A3 => 3);
impl_into_handler!(A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4);
impl_into_handler!(A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5);

struct HandlerInner {
    signature: Signature,
    call: Box<ErasedFn>,
}

/// Shared reference to a registered callable.
///
/// Equality is identity: clones of one `Handler` compare equal, two handlers
/// built from identical closures do not.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerInner>,
}

impl Handler {
    pub fn new<Marker, F>(f: F) -> Self
    where
        F: IntoHandler<Marker>,
    {
        Self {
            inner: Arc::new(HandlerInner {
                signature: F::signature(),
                call: f.into_erased(),
            }),
        }
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    /// Checked call: validates `args` against the signature first
    pub fn invoke(&self, id: EventId, args: &[&dyn Any]) -> EventResult<Value> {
        self.inner.signature.check_args(id, args)?;
        self.call(id, args)
    }

    /// Call without re-checking the signature; the caller has validated `args`
    pub(crate) fn call(&self, id: EventId, args: &[&dyn Any]) -> EventResult<Value> {
        (self.inner.call)(args).map_err(|index| EventError::ArgumentTypeMismatch {
            id,
            index,
            expected: self
                .inner
                .signature
                .params()
                .get(index)
                .map_or("<unknown>", TypeTag::name),
        })
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("signature", &format_args!("{}", self.inner.signature))
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

/// Downcast a handler's return value, reporting `found` on failure
pub(crate) fn downcast_value<T: Any>(id: EventId, value: Value, found: &TypeTag) -> EventResult<T> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| EventError::ResultCast {
            id,
            expected: any::type_name::<T>(),
            found: found.name(),
        })
}

/// Build an argument slice for [`Handler::invoke`] and the registry's send calls.
///
/// ```rust,ignore
/// registry.send(EventIds::Test2, args![666])?;
/// ```
#[macro_export]
macro_rules! args {
    () => {
        &[] as &[&dyn ::std::any::Any]
    };
    ($($arg:expr),+ $(,)?) => {
        &[$(&$arg as &dyn ::std::any::Any),+] as &[&dyn ::std::any::Any]
    };
}
