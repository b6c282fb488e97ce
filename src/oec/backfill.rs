//! Filling blank SIS IDs from the campus feed.

use std::collections::{HashMap, HashSet};

use log::{error, info};

use crate::error::Error;
use crate::ports::CampusData;
use crate::worksheet::oec::SisImportColumn;
use crate::worksheet::Row;

/// Looks up SIS IDs for rows that lack one, `batch_size` IDs per query.
///
/// A failed query is logged and its batch left blank. Returns the number
/// of rows filled.
pub fn backfill_sis_ids(rows: &mut [Row<SisImportColumn>], campus: &dyn CampusData, batch_size: usize) -> usize {
    let mut seen = HashSet::new();
    let uids: Vec<String> = rows
        .iter()
        .filter(|row| row.is_blank(SisImportColumn::SisId) && !row.is_blank(SisImportColumn::LdapUid))
        .map(|row| row.get(SisImportColumn::LdapUid).trim().to_string())
        .filter(|uid| seen.insert(uid.clone()))
        .collect();
    if uids.is_empty() {
        return 0;
    }

    let mut sis_ids: HashMap<String, String> = HashMap::new();
    for batch in uids.chunks(batch_size.max(1)) {
        match campus.attributes_for_uids(batch) {
            Ok(people) => {
                sis_ids.extend(people.into_iter().map(|p| (p.ldap_uid.trim().to_string(), p.sis_user_id())));
            }
            Err(e) => error!("{}", Error::external("SIS ID back-fill lookup", e)),
        }
    }

    let mut filled = 0;
    for row in rows.iter_mut().filter(|row| row.is_blank(SisImportColumn::SisId)) {
        if let Some(sis_id) = sis_ids.get(row.get(SisImportColumn::LdapUid).trim()) {
            row.set(SisImportColumn::SisId, sis_id.as_str());
            filled += 1;
        }
    }
    info!("Back-filled {filled} SIS IDs for {} instructors", uids.len());
    filled
}
