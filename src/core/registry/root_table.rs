/*!

The `RootTable` maps caller-chosen names to the objects the runtime holds from outside the heap: globals, stack
slots, interned constants. Marking starts here.

It is a separately chained hash table over a bucket array whose length doubles whenever the load factor
(entries / buckets) exceeds `MAX_LOAD_FACTOR`. Bucket choice is `geece_hash(key) % bucket_count`.

The table only stores handles. Each entry stands for one reference held on its object, but the table does not
touch reference counts itself: `Heap::register_root` retains and releases around `insert`, `remove` and `clear`.

Growing is copy-and-swap. `rehash` builds the complete new bucket array from the old one and only then swaps it
in and drops the old chains, so the table is never observable with a partial set of entries.

*/

use std::fmt::{Debug, Formatter};

use crate::{
  abstractions::{
    log::debug,
    IString
  },
  core::{
    object::ObjectId,
    registry::hash::geece_hash
  }
};

/// Rehash once entries exceed this fraction of the bucket count.
pub const MAX_LOAD_FACTOR: f64 = 0.75;

type Link = Option<Box<Entry>>;

struct Entry {
  key   : IString,
  hash  : u32,
  object: ObjectId,
  next  : Link,
}

pub struct RootTable {
  buckets     : Vec<Link>,
  len         : usize,
  rehash_count: usize,
}

impl RootTable {
  /// A table with `initial_capacity` buckets. A capacity of zero is bumped to one.
  pub fn with_capacity(initial_capacity: usize) -> Self {
    RootTable {
      buckets     : empty_buckets(initial_capacity.max(1)),
      len         : 0,
      rehash_count: 0,
    }
  }

  // region Accessors

  #[inline(always)]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline(always)]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  #[inline(always)]
  pub fn bucket_count(&self) -> usize {
    self.buckets.len()
  }

  #[inline(always)]
  pub fn load_factor(&self) -> f64 {
    self.len as f64 / self.buckets.len() as f64
  }

  /// How many times the table has grown.
  #[inline(always)]
  pub fn rehash_count(&self) -> usize {
    self.rehash_count
  }

  // endregion Accessors

  #[inline(always)]
  fn bucket_index(&self, hash: u32) -> usize {
    hash as usize % self.buckets.len()
  }

  /// Maps `key` to `object`. If `key` was already present its previous object is returned and replaced.
  pub fn insert(&mut self, key: IString, object: ObjectId) -> Option<ObjectId> {
    let hash  = geece_hash(&key);
    let index = self.bucket_index(hash);

    let mut cursor = self.buckets[index].as_deref_mut();
    while let Some(entry) = cursor {
      if entry.hash == hash && entry.key == key {
        return Some(std::mem::replace(&mut entry.object, object));
      }
      cursor = entry.next.as_deref_mut();
    }

    let head = self.buckets[index].take();
    self.buckets[index] = Some(Box::new(Entry { key, hash, object, next: head }));
    self.len += 1;

    if self.load_factor() > MAX_LOAD_FACTOR {
      self.rehash();
    }

    None
  }

  /// Unmaps `key`, returning the object it named.
  pub fn remove(&mut self, key: &str) -> Option<ObjectId> {
    let hash     = geece_hash(key);
    let index    = self.bucket_index(hash);
    let mut link = &mut self.buckets[index];

    loop {
      let found = match link.as_ref() {
        None        => return None,
        Some(entry) => entry.hash == hash && &*entry.key == key,
      };

      if found {
        let mut removed = link.take()?;
        *link    = removed.next.take();
        self.len -= 1;
        return Some(removed.object);
      }

      link = &mut link.as_mut()?.next;
    }
  }

  pub fn lookup(&self, key: &str) -> Option<ObjectId> {
    let hash       = geece_hash(key);
    let mut cursor = self.buckets[self.bucket_index(hash)].as_deref();

    while let Some(entry) = cursor {
      if entry.hash == hash && &*entry.key == key {
        return Some(entry.object);
      }
      cursor = entry.next.as_deref();
    }

    None
  }

  #[inline(always)]
  pub fn contains_key(&self, key: &str) -> bool {
    self.lookup(key).is_some()
  }

  /// Doubles the bucket count and redistributes every entry.
  pub fn rehash(&mut self) {
    let new_bucket_count = self.buckets.len() * 2;
    let mut new_buckets  = empty_buckets(new_bucket_count);

    for entry in self.entries() {
      let index = entry.hash as usize % new_bucket_count;
      let head  = new_buckets[index].take();
      new_buckets[index] = Some(Box::new(Entry {
        key   : entry.key.clone(),
        hash  : entry.hash,
        object: entry.object,
        next  : head,
      }));
    }

    let old_buckets = std::mem::replace(&mut self.buckets, new_buckets);
    drop_buckets(old_buckets);
    self.rehash_count += 1;

    debug!(3, "root table grew to {} buckets holding {} roots", new_bucket_count, self.len);
  }

  /// Removes every entry and returns the objects they named, one per entry. The bucket count is kept.
  pub fn clear(&mut self) -> Vec<ObjectId> {
    let objects = self.for_each().map(|(_, object)| object).collect();
    let bucket_count = self.buckets.len();
    let old_buckets  = std::mem::replace(&mut self.buckets, empty_buckets(bucket_count));
    drop_buckets(old_buckets);
    self.len = 0;
    objects
  }

  /// Every `(name, object)` pair, each once, in bucket order.
  ///
  /// The iterator borrows the table, so the table cannot change while it is alive.
  pub fn for_each(&self) -> Iter<'_> {
    Iter(self.entries())
  }

  fn entries(&self) -> EntryIter<'_> {
    EntryIter {
      buckets: self.buckets.iter(),
      cursor : None,
    }
  }
}

impl Drop for RootTable {
  fn drop(&mut self) {
    drop_buckets(std::mem::take(&mut self.buckets));
  }
}

impl Debug for RootTable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_map()
     .entries(self.for_each().map(|(key, object)| (&**key, object)))
     .finish()
  }
}

fn empty_buckets(count: usize) -> Vec<Link> {
  (0..count).map(|_| None).collect()
}

/// Unlinks chains one entry at a time so a long chain cannot overflow the stack through recursive `Box` drops.
fn drop_buckets(buckets: Vec<Link>) {
  for mut link in buckets {
    while let Some(mut entry) = link {
      link = entry.next.take();
    }
  }
}

struct EntryIter<'a> {
  buckets: std::slice::Iter<'a, Link>,
  cursor : Option<&'a Entry>,
}

impl<'a> Iterator for EntryIter<'a> {
  type Item = &'a Entry;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if let Some(entry) = self.cursor {
        self.cursor = entry.next.as_deref();
        return Some(entry);
      }
      self.cursor = self.buckets.next()?.as_deref();
    }
  }
}

pub struct Iter<'a>(EntryIter<'a>);

impl<'a> Iterator for Iter<'a> {
  type Item = (&'a IString, ObjectId);

  fn next(&mut self) -> Option<Self::Item> {
    self.0.next().map(|entry| (&entry.key, entry.object))
  }
}
