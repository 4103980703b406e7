//! Dispatch over the shapes a once-action can take.
//!
//! [`call_once`] accepts two kinds of action, mirroring the distinction
//! between a free function and a member function:
//!
//! - an ordinary invocable (closure, function item, or function pointer)
//!   with up to four forwarded arguments, and
//! - a method bound to a receiver, packaged as a [`BoundMethod`].
//!
//! Which kind is in play is decided entirely at compile time: the
//! [`OnceAction`] trait is parameterized by a shape marker ([`Plain`] or
//! [`Method`]) and every action type implements it for exactly one shape, so
//! there is no runtime tag and no dynamic dispatch.
//!
//! [`call_once`]: crate::call_once

use core::marker::PhantomData;

/// Shape marker for ordinary invocables taking `Args`.
pub struct Plain<Args>(PhantomData<Args>);

/// Shape marker for receiver-bound methods taking `Args` after the receiver.
pub struct Method<Args>(PhantomData<Args>);

/// An action that [`call_once`] can run, taking arguments `Self::Args`.
///
/// The `Shape` parameter exists only to keep the ordinary-invocable impls and
/// the [`BoundMethod`] impls from overlapping; callers never name it.
///
/// [`call_once`]: crate::call_once
pub trait OnceAction<Shape> {
   /// Tuple of arguments forwarded to the action.
   type Args;

   /// Consumes the action and runs it with `args`.
   fn invoke(self, args: Self::Args);
}

macro_rules! impl_plain_action {
   ($($arg:ident),*) => {
      impl<F, $($arg),*> OnceAction<Plain<($($arg,)*)>> for F
      where
         F: FnOnce($($arg),*),
      {
         type Args = ($($arg,)*);

         #[inline]
         #[allow(non_snake_case)]
         fn invoke(self, args: Self::Args) {
            let ($($arg,)*) = args;
            self($($arg),*)
         }
      }
   };
}

impl_plain_action!();
impl_plain_action!(A1);
impl_plain_action!(A1, A2);
impl_plain_action!(A1, A2, A3);
impl_plain_action!(A1, A2, A3, A4);

/// Mode marker: the receiver is passed to the method once, as its self
/// argument. This is what nearly every caller wants.
pub struct ReceiverOnly;

/// Mode marker: the receiver is passed as the method's self argument *and*
/// repeated as the first ordinary argument.
///
/// This reproduces a call convention some initialization code relies on,
/// where the method both runs on the receiver and receives it as data. Prefer
/// [`ReceiverOnly`] unless the method's signature asks for the repetition.
pub struct ForwardReceiver;

/// A method paired with the receiver to run it on.
///
/// `Mode` selects, at the type level, how the receiver reaches the method:
/// once ([`ReceiverOnly`], via [`new`]) or doubled ([`ForwardReceiver`], via
/// [`forwarding_receiver`]).
///
/// ```
/// use portable_once::{call_once, BoundMethod, OnceFlag};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct Registry {
///    loads: AtomicUsize,
/// }
///
/// impl Registry {
///    fn warm(&self) {
///       self.loads.fetch_add(1, Ordering::Relaxed);
///    }
/// }
///
/// let registry = Registry { loads: AtomicUsize::new(0) };
/// let warmed = OnceFlag::new();
///
/// call_once(&warmed, BoundMethod::new(&registry, Registry::warm), ());
/// call_once(&warmed, BoundMethod::new(&registry, Registry::warm), ());
/// assert_eq!(registry.loads.load(Ordering::Relaxed), 1);
/// ```
///
/// [`new`]: BoundMethod::new
/// [`forwarding_receiver`]: BoundMethod::forwarding_receiver
pub struct BoundMethod<'r, T, M, Mode = ReceiverOnly> {
   receiver: &'r T,
   method: M,
   _mode: PhantomData<Mode>,
}

impl<'r, T, M> BoundMethod<'r, T, M, ReceiverOnly> {
   /// Binds `method` to `receiver`; the method sees the receiver once.
   #[inline]
   #[must_use]
   pub fn new(receiver: &'r T, method: M) -> Self {
      Self {
         receiver,
         method,
         _mode: PhantomData,
      }
   }
}

impl<'r, T, M> BoundMethod<'r, T, M, ForwardReceiver> {
   /// Binds `method` to `receiver`; the method sees the receiver as its self
   /// argument and again as its first ordinary argument.
   #[inline]
   #[must_use]
   pub fn forwarding_receiver(receiver: &'r T, method: M) -> Self {
      Self {
         receiver,
         method,
         _mode: PhantomData,
      }
   }
}

macro_rules! impl_method_action {
   ($($arg:ident),*) => {
      impl<'r, T, M, $($arg),*> OnceAction<Method<($($arg,)*)>>
         for BoundMethod<'r, T, M, ReceiverOnly>
      where
         M: FnOnce(&'r T, $($arg),*),
      {
         type Args = ($($arg,)*);

         #[inline]
         #[allow(non_snake_case)]
         fn invoke(self, args: Self::Args) {
            let ($($arg,)*) = args;
            (self.method)(self.receiver, $($arg),*)
         }
      }

      impl<'r, T, M, $($arg),*> OnceAction<Method<($($arg,)*)>>
         for BoundMethod<'r, T, M, ForwardReceiver>
      where
         M: FnOnce(&'r T, &'r T, $($arg),*),
      {
         type Args = ($($arg,)*);

         #[inline]
         #[allow(non_snake_case)]
         fn invoke(self, args: Self::Args) {
            let ($($arg,)*) = args;
            (self.method)(self.receiver, self.receiver, $($arg),*)
         }
      }
   };
}

impl_method_action!();
impl_method_action!(A1);
impl_method_action!(A1, A2);
impl_method_action!(A1, A2, A3);
impl_method_action!(A1, A2, A3, A4);
