use crate::{
    assets::{catalog::PhotoStyleKey, decode::Photo},
    foundation::{
        core::SLOT_COUNT,
        error::{BoothError, BoothResult},
    },
    stylize::gateway::StylizationGateway,
};

/// Result of stylizing one photo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StylizeOutcome {
    pub photo: Photo,
    /// The model refused image input and the photo came from text-only generation.
    pub fallback: bool,
}

/// Restyle one photo.
///
/// The pass-through style returns the input untouched without calling the gateway. When
/// the model rejects image input, the same prompt is retried as text-only generation.
#[tracing::instrument(skip(gateway, photo), fields(style = %style))]
pub async fn stylize_photo(
    gateway: &dyn StylizationGateway,
    photo: &Photo,
    style: PhotoStyleKey,
) -> BoothResult<StylizeOutcome> {
    if style.is_passthrough() {
        return Ok(StylizeOutcome {
            photo: photo.clone(),
            fallback: false,
        });
    }
    match gateway.stylize(&photo.png, style.prompt(), 1).await {
        Ok(resp) => Ok(StylizeOutcome {
            photo: resp.first_photo()?,
            fallback: false,
        }),
        Err(BoothError::UnsupportedModelInput(msg)) => {
            tracing::warn!(reason = %msg, "image input rejected, using text-only generation");
            let resp = gateway.generate(style.prompt(), 1).await?;
            Ok(StylizeOutcome {
                photo: resp.first_photo()?,
                fallback: true,
            })
        }
        Err(err) => Err(err),
    }
}

/// Claim to commit a stylized photo for `slot` under the style version it was issued at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StyleTicket {
    pub version: u64,
    pub style: PhotoStyleKey,
    pub slot: usize,
}

/// Current photo style plus the stylized results requested under it.
///
/// Every style change bumps `version`; results carrying an older version are discarded.
#[derive(Clone, Debug, Default)]
pub struct StyleLedger {
    version: u64,
    style: Option<PhotoStyleKey>,
    results: [Option<Photo>; SLOT_COUNT],
}

impl StyleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn style(&self) -> Option<PhotoStyleKey> {
        self.style
    }

    /// Switch style, invalidating every stored result. Returns the new version.
    pub fn select(&mut self, style: Option<PhotoStyleKey>) -> u64 {
        self.style = style;
        self.invalidate()
    }

    /// Drop every stored result, e.g. after the source photos changed.
    pub fn invalidate(&mut self) -> u64 {
        self.version += 1;
        self.results = Default::default();
        self.version
    }

    pub fn ticket(&self, slot: usize) -> Option<StyleTicket> {
        let style = self.style?;
        (slot < SLOT_COUNT).then_some(StyleTicket {
            version: self.version,
            style,
            slot,
        })
    }

    /// Store `photo` if `ticket` is still current. Returns whether it was kept.
    pub fn commit(&mut self, ticket: StyleTicket, photo: Photo) -> bool {
        if ticket.version != self.version || Some(ticket.style) != self.style {
            tracing::debug!(
                slot = ticket.slot,
                stale = ticket.version,
                current = self.version,
                "discarding stale stylized result"
            );
            return false;
        }
        self.results[ticket.slot] = Some(photo);
        true
    }

    pub fn result(&self, slot: usize) -> Option<&Photo> {
        self.results.get(slot).and_then(Option::as_ref)
    }

    pub fn results(&self) -> &[Option<Photo>; SLOT_COUNT] {
        &self.results
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stylize/service.rs"]
mod tests;
