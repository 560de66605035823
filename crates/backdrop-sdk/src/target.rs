// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use backdrop_core::feature::MountTarget;

/// Where to mount a background.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A target the host already resolved.
    Handle(MountTarget),
    /// A selector resolved through the orchestrator's [`TargetResolver`].
    Selector(String),
}

impl From<MountTarget> for Target {
    fn from(target: MountTarget) -> Self {
        Target::Handle(target)
    }
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_owned())
    }
}

impl From<String> for Target {
    fn from(selector: String) -> Self {
        Target::Selector(selector)
    }
}

/// Resolves selectors into mount targets on behalf of the host.
pub trait TargetResolver: Send + Sync {
    /// The target matching `selector`, if any.
    fn resolve(&self, selector: &str) -> Option<MountTarget>;
}

impl<F> TargetResolver for F
where
    F: Fn(&str) -> Option<MountTarget> + Send + Sync,
{
    fn resolve(&self, selector: &str) -> Option<MountTarget> {
        self(selector)
    }
}

impl Target {
    /// Resolves into a concrete target. A selector without a resolver never
    /// resolves.
    pub(crate) fn resolve(self, resolver: Option<&Arc<dyn TargetResolver>>) -> Option<MountTarget> {
        match self {
            Target::Handle(target) => Some(target),
            Target::Selector(selector) => resolver?.resolve(&selector),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_resolve_to_themselves() {
        let target = Target::from(MountTarget::new("hero"));
        assert_eq!(target.resolve(None), Some(MountTarget::new("hero")));
    }

    #[test]
    fn selectors_need_a_resolver() {
        assert_eq!(Target::from("#hero").resolve(None), None);

        let resolver: Arc<dyn TargetResolver> = Arc::new(|selector: &str| {
            (selector == "#hero").then(|| MountTarget::new("hero").with_size(800.0, 600.0))
        });
        let resolved = Target::from("#hero").resolve(Some(&resolver)).unwrap();
        assert_eq!(resolved.size(), Some((800.0, 600.0)));
        assert!(Target::from("#missing").resolve(Some(&resolver)).is_none());
    }
}
