/*!
  The function table maps the function id of a `CALL` instruction to the native function that
  implements it.

  The table is filled once while the interpreter is being set up and is never modified after
  that, so lookups need no locking and the table can be shared between replay sessions behind
  an `Arc`. Registering the same id twice can only be a wiring mistake among the built-in
  functions, never a property of the replay data, so it stops the process instead of being
  reported as an error.
*/

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use bimap::BiMap;
use prettytable::Table;
use string_cache::DefaultAtom;
use tracing::{debug, error};

use crate::display::TABLE_DISPLAY_FORMAT;

/// The function identifier. These are part of the protocol between the server and the replay
/// system, and so must remain consistent.
pub type FunctionId = u16;

/**
  A function callable by the interpreter with a `CALL` instruction. `stack` is the stack of the
  virtual machine, and `push_return` is true if the caller expects the return value of the
  function to be pushed onto the stack. Returns true if the call was successful.

  Any `Fn(&mut S, bool) -> bool` closure that is `Send + Sync` is a handler.
*/
pub trait Handler<S>: Send + Sync {
  fn call(&self, stack: &mut S, push_return: bool) -> bool;
}

impl<S, F> Handler<S> for F
  where F: Fn(&mut S, bool) -> bool + Send + Sync
{
  fn call(&self, stack: &mut S, push_return: bool) -> bool {
    self(stack, push_return)
  }
}

pub struct FunctionTable<S> {
  /// Map of the supported function ids to the actual function implementations.
  functions : HashMap<FunctionId, Box<dyn Handler<S>>>,
  /// Optional human readable names, for diagnostics only.
  names     : BiMap<DefaultAtom, FunctionId>,
}

impl<S> FunctionTable<S> {

  pub fn new() -> FunctionTable<S> {
    FunctionTable {
      functions : HashMap::new(),
      names     : BiMap::new(),
    }
  }

  /// Inserts a function into the table. Panics if `id` is already registered.
  pub fn insert<H>(&mut self, id: FunctionId, handler: H)
    where H: Handler<S> + 'static
  {
    if self.functions.contains_key(&id) {
      error!(id, "duplicate function inserted into table");
      panic!("Duplicate functions inserted into table: {}", id);
    }
    debug!(id, "function registered");
    self.functions.insert(id, Box::new(handler));
  }

  /// Inserts a function and records its name. Panics if either `id` or `name` is already
  /// registered.
  pub fn insert_named<H>(&mut self, id: FunctionId, name: &str, handler: H)
    where H: Handler<S> + 'static
  {
    let name = DefaultAtom::from(name);
    if self.names.contains_left(&name) {
      error!(id, name = %name, "duplicate function name inserted into table");
      panic!("Duplicate function name inserted into table: {}", name);
    }
    self.insert(id, handler);
    // `id` is fresh, so neither side can be overwritten here.
    let inserted = self.names.insert_no_overwrite(name, id);
    debug_assert!(inserted.is_ok());
  }

  /// Returns the function registered for `id`, or `None` if there is no such function.
  pub fn lookup(&self, id: FunctionId) -> Option<&dyn Handler<S>> {
    self.functions.get(&id).map(|handler| &**handler)
  }

  pub fn contains(&self, id: FunctionId) -> bool {
    self.functions.contains_key(&id)
  }

  pub fn name_of(&self, id: FunctionId) -> Option<&str> {
    self.names.get_by_right(&id).map(|name| &**name)
  }

  pub fn id_of(&self, name: &str) -> Option<FunctionId> {
    self.names.get_by_left(&DefaultAtom::from(name)).copied()
  }

  pub fn len(&self) -> usize {
    self.functions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.functions.is_empty()
  }

  /// The registered ids in ascending order.
  pub fn ids(&self) -> Vec<FunctionId> {
    let mut ids: Vec<FunctionId> = self.functions.keys().copied().collect();
    ids.sort_unstable();
    ids
  }
}

impl<S> Default for FunctionTable<S> {
  fn default() -> Self {
    FunctionTable::new()
  }
}

impl<S> Display for FunctionTable<S> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Id", ubl->"Function"]);

    for id in self.ids() {
      table.add_row(row![r->id, self.name_of(id).unwrap_or("-")]);
    }

    write!(f, "{}", table)
  }
}
