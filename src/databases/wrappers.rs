
use serde::{Serialize, Deserialize};

use std::convert::From;

use crate::databases::database::Database;
use crate::databases::database::DBEntry;
use crate::databases::database::DB;
use crate::utility::error::Result;
use crate::utility::mixed::BoxedFuture;
use crate::impl_singleton;


macro_rules! as_db_entry {
    ($name:ident, $($field_name:ident: $field_type:ty),*) => {

        #[derive(Serialize, Deserialize, Clone, Debug)]
        pub struct $name {
            pub id: i64,
            pub key: String,
            pub timestamp: i64,
            $(pub $field_name: $field_type),*
        }

        impl $name {
            pub fn new($($field_name: $field_type),*) -> Self {
                $name {
                    id: 0,
                    key: "".to_string(),
                    timestamp: 0,
                    $($field_name),*
                }
            }
            pub fn into(self) -> String {
                let mut relevant_fields = Vec::<String>::new();
                for field in vec![$(self.$field_name.to_string()),*] {
                    relevant_fields.push(field);
                }
                serde_json::to_string(&relevant_fields).unwrap()
            }
        }

        impl From<DBEntry> for $name {
            fn from(entry: DBEntry) -> $name {
                let mut relevant: Vec<String> = serde_json::from_str(&entry.value).unwrap();
                relevant.reverse();
                $name {
                    id: entry.id,
                    key: entry.key,
                    timestamp: entry.timestamp,
                    $($field_name: relevant.pop().unwrap().parse().unwrap()),*
                }
            }
        }
    }
}

as_db_entry!(UserState,
    wallet: i64,
    bank: i64,
    xp: i64,
    level: i64,
    voice_seconds: i64);

impl UserState {
    pub fn fresh() -> Self {
        UserState::new(0, 0, 0, 0, 0)
    }
}

// assigned_staff_id == 0 means unassigned, closed_at == 0 means still open
as_db_entry!(TicketLog,
    channel_id: u64,
    opener_id: u64,
    ticket_type: String,
    status: String,
    assigned_staff_id: u64,
    created_at: i64,
    closed_at: i64,
    uuid: String);

impl TicketLog {
    pub fn is_open(&self) -> bool {
        self.status == "open"
    }
}

as_db_entry!(DeferredLog, category: String, fire_at: i64, payload: String);

impl DeferredLog {
    pub fn is_due(&self, now: i64) -> bool {
        self.fire_at <= now
    }
}

as_db_entry!(ModLog, staff_id: String, reason: String);

as_db_entry!(Note, content: String);


pub trait DatabaseWrapper<T: From<DBEntry>>: Send + Sync {

    fn get_database(&self) -> &Database;

    fn get<'a>(&'a self, key: &'a str) -> BoxedFuture<'a, Result<Option<T>>> {
        Box::pin(async move {
            let entry = self.get_database().get(key).await?;
            Ok(entry.map(T::from))
        })
    }

    fn get_all<'a>(&'a self, key: &'a str) -> BoxedFuture<'a, Result<Vec<T>>> {
        Box::pin(async move {
            let entries = self.get_database().get_all(key).await?;
            Ok(entries.into_iter().map(T::from).collect())
        })
    }

    fn get_last<'a>(&'a self, key: &'a str, limit: u8) -> BoxedFuture<'a, Result<Vec<T>>> {
        Box::pin(async move {
            let entries = self.get_database().get_last(key, limit).await?;
            Ok(entries.into_iter().map(T::from).collect())
        })
    }

    fn query_prefix<'a>(&'a self, prefix: &'a str) -> BoxedFuture<'a, Result<Vec<T>>> {
        Box::pin(async move {
            let entries = self.get_database().query_prefix(prefix).await?;
            Ok(entries.into_iter().map(T::from).collect())
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxedFuture<'a, Result<()>> {
        Box::pin(async move {
            self.get_database().set(key, value).await
        })
    }

    fn append<'a>(&'a self, key: &'a str, value: &'a str) -> BoxedFuture<'a, Result<()>> {
        Box::pin(async move {
            self.get_database().append(key, value).await
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxedFuture<'a, Result<()>> {
        Box::pin(async move {
            self.get_database().delete(key).await
        })
    }

    fn delete_by_id<'a>(&'a self, id: i64) -> BoxedFuture<'a, Result<()>> {
        Box::pin(async move {
            self.get_database().delete_by_id(id).await
        })
    }
}

macro_rules! impl_database_wrapper {

    ($name:ident, $db_type:expr, $log_type:ty) => {
        pub struct $name {
            database: Database
        }

        impl $name {
            pub fn new() -> Self {
                $name { database: Database::new($db_type) }
            }
        }

        impl DatabaseWrapper<$log_type> for $name {
            fn get_database(&self) -> &Database {
                &self.database
            }
        }

        impl_singleton!($name);
    };

    ($name:ident, $db_type:expr) => {
        impl_database_wrapper!($name, $db_type, DBEntry);
    };
}

impl_database_wrapper!(ConfigDB, DB::Config);
impl_database_wrapper!(UsersDB, DB::Users, UserState);
impl_database_wrapper!(TicketsDB, DB::Tickets, TicketLog);
impl_database_wrapper!(DeferredDB, DB::Deferred, DeferredLog);
impl_database_wrapper!(WarningsDB, DB::Warnings, ModLog);
impl_database_wrapper!(MutesDB, DB::Mutes, ModLog);
impl_database_wrapper!(NotesDB, DB::Notes, Note);
