use core::mem::MaybeUninit;

/// Tag of a slot that holds nothing.
pub(crate) const EMPTY_HASH: u64 = 0;

/// Tag of the permanent sentinel stored after the last bucket.
pub(crate) const END_HASH: u64 = 1;

/// Reserved high bit marking a slot whose tag is a stored hash.
///
/// Every stored hash carries this bit, so a stored hash can never collide
/// with [`EMPTY_HASH`] or [`END_HASH`]. Bucket selection only looks at the
/// low bits, which the tag leaves untouched.
pub(crate) const FILLED_BIT: u64 = 1 << 63;

/// A single cell of the backing array.
///
/// The `hash` field doubles as the state tag: `EMPTY_HASH`, `END_HASH`, or a
/// hash with `FILLED_BIT` set. `value` is initialized if and only if the
/// filled bit is set.
pub(crate) struct Slot<V> {
    hash: u64,
    value: MaybeUninit<V>,
}

impl<V> Slot<V> {
    #[inline(always)]
    pub(crate) const fn empty() -> Self {
        Self {
            hash: EMPTY_HASH,
            value: MaybeUninit::uninit(),
        }
    }

    /// The raw tag. Only meaningful as a hash when [`Slot::is_filled`].
    #[inline(always)]
    pub(crate) fn hash(&self) -> u64 {
        self.hash
    }

    #[inline(always)]
    pub(crate) fn is_empty(&self) -> bool {
        self.hash == EMPTY_HASH
    }

    #[inline(always)]
    pub(crate) fn is_end(&self) -> bool {
        self.hash == END_HASH
    }

    #[inline(always)]
    pub(crate) fn is_filled(&self) -> bool {
        self.hash & FILLED_BIT != 0
    }

    #[inline(always)]
    pub(crate) fn value(&self) -> Option<&V> {
        if self.is_filled() {
            // SAFETY: The filled bit is only set after `value` was written.
            Some(unsafe { self.value.assume_init_ref() })
        } else {
            None
        }
    }

    #[inline(always)]
    pub(crate) fn value_mut(&mut self) -> Option<&mut V> {
        if self.is_filled() {
            // SAFETY: The filled bit is only set after `value` was written.
            Some(unsafe { self.value.assume_init_mut() })
        } else {
            None
        }
    }

    /// Returns the stored value without checking the tag.
    ///
    /// # Safety
    ///
    /// The caller must ensure the slot is filled.
    #[inline(always)]
    pub(crate) unsafe fn value_unchecked(&self) -> &V {
        debug_assert!(self.is_filled());
        // SAFETY: Caller guarantees the slot is filled.
        unsafe { self.value.assume_init_ref() }
    }

    /// Returns the stored value without checking the tag.
    ///
    /// # Safety
    ///
    /// The caller must ensure the slot is filled.
    #[inline(always)]
    pub(crate) unsafe fn value_unchecked_mut(&mut self) -> &mut V {
        debug_assert!(self.is_filled());
        // SAFETY: Caller guarantees the slot is filled.
        unsafe { self.value.assume_init_mut() }
    }

    /// Stores `value`, assigning over the previous occupant if there is one.
    #[inline]
    pub(crate) fn set_filled(&mut self, hash: u64, value: V) {
        if let Some(current) = self.value_mut() {
            *current = value;
        } else {
            self.value.write(value);
        }
        self.hash = hash | FILLED_BIT;
    }

    #[inline]
    pub(crate) fn set_empty(&mut self) {
        self.drop_value();
        self.hash = EMPTY_HASH;
    }

    #[inline]
    pub(crate) fn set_end(&mut self) {
        self.drop_value();
        self.hash = END_HASH;
    }

    /// Moves the value out, leaving the slot empty.
    #[inline]
    pub(crate) fn take(&mut self) -> Option<(u64, V)> {
        if !self.is_filled() {
            return None;
        }

        let hash = self.hash;
        self.hash = EMPTY_HASH;
        // SAFETY: The slot was filled and its tag is now cleared, so the value
        // is read exactly once and never dropped in place.
        Some((hash, unsafe { self.value.assume_init_read() }))
    }

    /// Exchanges the occupant with a carried entry.
    ///
    /// # Safety
    ///
    /// The caller must ensure the slot is filled and that `hash` carries
    /// `FILLED_BIT`.
    #[inline]
    pub(crate) unsafe fn swap(&mut self, hash: &mut u64, value: &mut V) {
        debug_assert!(self.is_filled());
        debug_assert!(*hash & FILLED_BIT != 0);
        // SAFETY: Caller guarantees the slot is filled.
        unsafe {
            core::mem::swap(self.value.assume_init_mut(), value);
        }
        core::mem::swap(&mut self.hash, hash);
    }

    #[inline]
    fn drop_value(&mut self) {
        if self.is_filled() {
            // Clear the tag first so a panicking destructor can't cause a
            // second drop.
            self.hash = EMPTY_HASH;
            // SAFETY: The slot was filled, so `value` is initialized.
            unsafe { self.value.assume_init_drop() }
        }
    }
}

impl<V> Drop for Slot<V> {
    fn drop(&mut self) {
        self.drop_value();
    }
}

impl<V: Clone> Clone for Slot<V> {
    fn clone(&self) -> Self {
        match self.value() {
            Some(value) => Self {
                hash: self.hash,
                value: MaybeUninit::new(value.clone()),
            },
            None => Self {
                hash: self.hash,
                value: MaybeUninit::uninit(),
            },
        }
    }
}
