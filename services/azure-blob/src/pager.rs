// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt::{self, Debug};

use azblob_core::Result;
use futures::future::BoxFuture;
use futures::Stream;

type FetchPage<T> =
    Box<dyn FnMut(Option<String>) -> BoxFuture<'static, Result<(T, Option<String>)>> + Send>;

/// A lazy sequence of listing pages.
///
/// Every call to [`Pager::next_page`] fetches one page and remembers the
/// continuation marker the service returned. A pager can't be rewound;
/// build a new one to list again.
pub struct Pager<T> {
    fetch: FetchPage<T>,
    marker: Option<String>,
    done: bool,
}

impl<T> Debug for Pager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("marker", &self.marker)
            .field("done", &self.done)
            .finish()
    }
}

impl<T: Send + 'static> Pager<T> {
    /// `fetch` gets the marker of the page to load and returns the page
    /// along with the marker of the next one.
    pub(crate) fn new<F>(marker: Option<String>, fetch: F) -> Self
    where
        F: FnMut(Option<String>) -> BoxFuture<'static, Result<(T, Option<String>)>>
            + Send
            + 'static,
    {
        Self {
            fetch: Box::new(fetch),
            marker,
            done: false,
        }
    }

    /// Check if another page may be fetched.
    pub fn more(&self) -> bool {
        !self.done
    }

    /// Marker of the next page, `None` before the first page or at the end.
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// Fetch the next page, `None` once the listing is exhausted.
    ///
    /// A failed fetch keeps the current marker, so calling again retries the
    /// same page.
    pub async fn next_page(&mut self) -> Result<Option<T>> {
        if self.done {
            return Ok(None);
        }

        let (page, next) = (self.fetch)(self.marker.clone()).await?;
        self.marker = next.filter(|v| !v.is_empty());
        if self.marker.is_none() {
            self.done = true;
        }
        Ok(Some(page))
    }

    /// Pages as a stream that ends after the last page or the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send {
        futures::stream::unfold(self, |mut pager| async move {
            match pager.next_page().await {
                Ok(Some(page)) => Some((Ok(page), pager)),
                Ok(None) => None,
                Err(err) => {
                    pager.done = true;
                    Some((Err(err), pager))
                }
            }
        })
    }
}
