use crate::Error;
use crate::bill_id::BillId;
use crate::records::Matter;
use crate::source::{MatterFilter, RecordApi};

/// Fetch the single matter filed under `id`.
///
/// Zero matches and several matches both come back as `NotFound`; the
/// ambiguous case is logged since the filter is supposed to be unique.
pub(crate) async fn unique_matter(api: &dyn RecordApi, id: &BillId) -> Result<Matter, Error> {
    let filter = MatterFilter::for_bill(id);
    let mut matters = api.matters(&filter).await?;
    match matters.len() {
        1 => Ok(matters.remove(0)),
        0 => Err(Error::NotFound(format!("no matter filed as {}", id.file()))),
        n => {
            tracing::warn!(file = %id.file(), matches = n, "ambiguous matter lookup");
            Err(Error::NotFound(format!("{n} matters filed as {}", id.file())))
        }
    }
}
